//! 트레이드 리퍼블릭 WebSocket 구독 클라이언트.
//!
//! 프레임 코덱, 구독 레지스트리, 연결 관리, 라우팅, 페이지네이션,
//! 상세 조회 팬아웃과 로그인 흐름을 제공합니다.
//!
//! # 예제
//!
//! ```rust,ignore
//! use trexport_socket::{fetch_timeline, ApiConfig, FetchOptions, Session, StreamConfig};
//!
//! let session = Session::connect(&api, &stream, token).await?;
//! let snapshot = fetch_timeline(&mut session, FetchOptions::from(&stream)).await?;
//! ```

pub mod auth;
pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod pagination;
pub mod session;
pub mod subscription;
pub mod timeline;
pub mod transport;

pub use auth::{LoginChallenge, SessionToken, TradeRepublicAuth};
pub use codec::{decode, encode_subscribe, encode_unsubscribe, Decoded, Frame, Verb};
pub use config::{ApiConfig, StreamConfig};
pub use connection::{Connection, ConnectionEvent, ConnectionState};
pub use dispatcher::{route, Dispatch, TimelinePayload};
pub use error::SocketError;
pub use fanout::{DetailIdStrategy, EmptyWorkSet, FanOut, FanOutProgress, FanOutState};
pub use pagination::{PageProgress, PageState, Paginator};
pub use session::{Flow, RequestSink, Session, SessionHandler};
pub use subscription::{Subscription, SubscriptionKind, SubscriptionRegistry};
pub use timeline::{fetch_timeline, FetchOptions, TimelineFetcher, TimelineSnapshot};
pub use transport::{connect_websocket, loopback, LoopbackPeer, TransportEvent, TransportHandle};
