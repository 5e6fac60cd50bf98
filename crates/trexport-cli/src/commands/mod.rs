//! CLI 명령어 구현 모듈.

pub mod convert;
pub mod export;
pub mod interactive;
