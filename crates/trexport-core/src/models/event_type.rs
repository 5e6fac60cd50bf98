//! 타임라인 이벤트 유형과 분류 규칙.
//!
//! 서버가 보내는 `eventType` 값은 계정 이력에 따라 일관되지 않으므로
//! 제목/부제목 문구로 다시 분류합니다.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 거래 이벤트 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionEventType {
    #[serde(rename = "INCOMING_TRANSFER_DELEGATION")]
    IncomingTransferDelegation,
    #[serde(rename = "card_successful_transaction")]
    CardSuccessfulTransaction,
    #[serde(rename = "card_failed_transaction")]
    CardFailedTransaction,
    /// 적립식 투자
    #[serde(rename = "trading_savingsplan_executed")]
    SavingsPlanExecuted,
    /// 잔돈 투자
    #[serde(rename = "benefits_spare_change_execution")]
    SpareChangeExecution,
    /// 세이브백 보너스
    #[serde(rename = "benefits_saveback_execution")]
    SavebackExecution,
    #[serde(rename = "card_successful_verification")]
    CardSuccessfulVerification,
    /// 이자 지급
    #[serde(rename = "INTEREST_PAYOUT")]
    InterestPayout,
    #[serde(rename = "OUTGOING_TRANSFER_DELEGATION")]
    OutgoingTransferDelegation,
    /// 매수/매도 체결
    #[serde(rename = "trading_trade_executed")]
    TradeExecuted,
    #[serde(rename = "card_refund")]
    CardRefund,
    /// 현금 배당
    #[serde(rename = "ssp_corporate_action_invoice_cash")]
    DividendCash,
    #[serde(rename = "card_failed_verification")]
    CardFailedVerification,
    /// 배당 세금 정정
    #[serde(rename = "ssp_tax_correction_invoice")]
    TaxCorrection,
    #[serde(rename = "OUTGOING_TRANSFER")]
    OutgoingTransfer,
    #[serde(rename = "timeline_legacy_migrated_events")]
    LegacyMigrated,
    #[serde(rename = "INCOMING_TRANSFER")]
    IncomingTransfer,
    #[serde(rename = "card_order_billed")]
    CardOrderBilled,
    #[serde(rename = "GIFTER_TRANSACTION")]
    GifterTransaction,
    /// 친구에게 받은 주식 선물 (활동 내역에서 합성)
    #[serde(rename = "GIFTING_RECIPIENT_ACTIVITY")]
    GiftReceived,
    /// 계좌 개설 주식 보상 (활동 내역에서 합성)
    #[serde(rename = "STOCK_PERK_REFUNDED")]
    StockPerkRefunded,
}

impl TransactionEventType {
    const ALL: [TransactionEventType; 21] = [
        Self::IncomingTransferDelegation,
        Self::CardSuccessfulTransaction,
        Self::CardFailedTransaction,
        Self::SavingsPlanExecuted,
        Self::SpareChangeExecution,
        Self::SavebackExecution,
        Self::CardSuccessfulVerification,
        Self::InterestPayout,
        Self::OutgoingTransferDelegation,
        Self::TradeExecuted,
        Self::CardRefund,
        Self::DividendCash,
        Self::CardFailedVerification,
        Self::TaxCorrection,
        Self::OutgoingTransfer,
        Self::LegacyMigrated,
        Self::IncomingTransfer,
        Self::CardOrderBilled,
        Self::GifterTransaction,
        Self::GiftReceived,
        Self::StockPerkRefunded,
    ];

    /// 서버 표기 문자열.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::IncomingTransferDelegation => "INCOMING_TRANSFER_DELEGATION",
            Self::CardSuccessfulTransaction => "card_successful_transaction",
            Self::CardFailedTransaction => "card_failed_transaction",
            Self::SavingsPlanExecuted => "trading_savingsplan_executed",
            Self::SpareChangeExecution => "benefits_spare_change_execution",
            Self::SavebackExecution => "benefits_saveback_execution",
            Self::CardSuccessfulVerification => "card_successful_verification",
            Self::InterestPayout => "INTEREST_PAYOUT",
            Self::OutgoingTransferDelegation => "OUTGOING_TRANSFER_DELEGATION",
            Self::TradeExecuted => "trading_trade_executed",
            Self::CardRefund => "card_refund",
            Self::DividendCash => "ssp_corporate_action_invoice_cash",
            Self::CardFailedVerification => "card_failed_verification",
            Self::TaxCorrection => "ssp_tax_correction_invoice",
            Self::OutgoingTransfer => "OUTGOING_TRANSFER",
            Self::LegacyMigrated => "timeline_legacy_migrated_events",
            Self::IncomingTransfer => "INCOMING_TRANSFER",
            Self::CardOrderBilled => "card_order_billed",
            Self::GifterTransaction => "GIFTER_TRANSACTION",
            Self::GiftReceived => "GIFTING_RECIPIENT_ACTIVITY",
            Self::StockPerkRefunded => "STOCK_PERK_REFUNDED",
        }
    }

    /// 서버 표기 문자열에서 변환. 모르는 값은 `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_wire() == value)
    }

    /// 증권 매매로 취급되는 유형인지 확인.
    pub fn is_trade(&self) -> bool {
        matches!(
            self,
            Self::TradeExecuted
                | Self::SavingsPlanExecuted
                | Self::SpareChangeExecution
                | Self::SavebackExecution
        )
    }
}

impl fmt::Display for TransactionEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// 활동 내역 이벤트 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityEventType {
    #[serde(rename = "trading_order_rejected")]
    OrderRejected,
    #[serde(rename = "EXEMPTION_ORDER_CHANGED")]
    ExemptionOrderChanged,
    #[serde(rename = "EXEMPTION_ORDER_CHANGE_REQUESTED")]
    ExemptionOrderChangeRequested,
    #[serde(rename = "TAX_YEAR_END_REPORT")]
    TaxYearEndReport,
    #[serde(rename = "PIN_CHANGED")]
    PinChanged,
    #[serde(rename = "MOBILE_CHANGED")]
    MobileChanged,
    #[serde(rename = "current_account_activated")]
    CurrentAccountActivated,
    #[serde(rename = "DOCUMENTS_ACCEPTED")]
    DocumentsAccepted,
    #[serde(rename = "DEVICE_RESET")]
    DeviceReset,
    /// 주식 선물 수령
    #[serde(rename = "GIFTING_RECIPIENT_ACTIVITY")]
    GiftReceived,
    #[serde(rename = "ssp_corporate_action_informative_notification")]
    CorporateActionNotification,
    #[serde(rename = "new_tr_iban")]
    NewIban,
    /// 주식 보상 수령
    #[serde(rename = "STOCK_PERK_REFUNDED")]
    StockPerkRefunded,
    #[serde(rename = "STOCK_PERK_EXPIRED")]
    StockPerkExpired,
}

impl ActivityEventType {
    const ALL: [ActivityEventType; 14] = [
        Self::OrderRejected,
        Self::ExemptionOrderChanged,
        Self::ExemptionOrderChangeRequested,
        Self::TaxYearEndReport,
        Self::PinChanged,
        Self::MobileChanged,
        Self::CurrentAccountActivated,
        Self::DocumentsAccepted,
        Self::DeviceReset,
        Self::GiftReceived,
        Self::CorporateActionNotification,
        Self::NewIban,
        Self::StockPerkRefunded,
        Self::StockPerkExpired,
    ];

    /// 서버 표기 문자열.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::OrderRejected => "trading_order_rejected",
            Self::ExemptionOrderChanged => "EXEMPTION_ORDER_CHANGED",
            Self::ExemptionOrderChangeRequested => "EXEMPTION_ORDER_CHANGE_REQUESTED",
            Self::TaxYearEndReport => "TAX_YEAR_END_REPORT",
            Self::PinChanged => "PIN_CHANGED",
            Self::MobileChanged => "MOBILE_CHANGED",
            Self::CurrentAccountActivated => "current_account_activated",
            Self::DocumentsAccepted => "DOCUMENTS_ACCEPTED",
            Self::DeviceReset => "DEVICE_RESET",
            Self::GiftReceived => "GIFTING_RECIPIENT_ACTIVITY",
            Self::CorporateActionNotification => "ssp_corporate_action_informative_notification",
            Self::NewIban => "new_tr_iban",
            Self::StockPerkRefunded => "STOCK_PERK_REFUNDED",
            Self::StockPerkExpired => "STOCK_PERK_EXPIRED",
        }
    }

    /// 서버 표기 문자열에서 변환. 모르는 값은 `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_wire() == value)
    }

    /// 거래 목록에 합성 거래로 추가해야 하는 유형이면 대응 거래 유형을 반환.
    pub fn as_received_stock(&self) -> Option<TransactionEventType> {
        match self {
            Self::GiftReceived => Some(TransactionEventType::GiftReceived),
            Self::StockPerkRefunded => Some(TransactionEventType::StockPerkRefunded),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// 매매 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// CSV 표기.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "Buy",
            TradeSide::Sell => "Sell",
        }
    }
}

/// 제목/부제목으로 거래 유형을 판별합니다.
pub fn identify_transaction_event_type(
    title: &str,
    subtitle: Option<&str>,
) -> Option<TransactionEventType> {
    let by_subtitle = match subtitle {
        Some("Cash dividend") => Some(TransactionEventType::DividendCash),
        Some("Buy Order" | "Sell Order" | "Limit Buy" | "Limit Sell") => {
            Some(TransactionEventType::TradeExecuted)
        }
        Some("Saving executed") => Some(TransactionEventType::SavingsPlanExecuted),
        Some("Round up") => Some(TransactionEventType::SpareChangeExecution),
        Some("Saveback") => Some(TransactionEventType::SavebackExecution),
        _ => None,
    };
    if by_subtitle.is_some() {
        return by_subtitle;
    }

    if title == "Interest" {
        return Some(TransactionEventType::InterestPayout);
    }

    match subtitle {
        Some("Cash dividend corrected") => Some(TransactionEventType::TaxCorrection),
        _ => None,
    }
}

/// 제목/부제목으로 활동 유형을 판별합니다.
pub fn identify_activity_event_type(
    title: &str,
    subtitle: Option<&str>,
) -> Option<ActivityEventType> {
    match (title, subtitle) {
        ("Stock Gift", Some("Accepted")) => Some(ActivityEventType::GiftReceived),
        ("Stock Perk", Some("Redeemed")) => Some(ActivityEventType::StockPerkRefunded),
        _ => None,
    }
}

/// 부제목으로 매매 방향을 판별합니다.
pub fn identify_trade_side(subtitle: Option<&str>) -> TradeSide {
    match subtitle {
        Some("Buy Order" | "Limit Buy" | "Saving executed" | "Round up" | "Saveback") => {
            TradeSide::Buy
        }
        _ => TradeSide::Sell,
    }
}

/// 모르는 `eventType` 문자열을 `None`으로 읽는 역직렬화기.
pub(crate) fn lenient_transaction_event_type<'de, D>(
    deserializer: D,
) -> Result<Option<TransactionEventType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(TransactionEventType::from_wire))
}

/// 모르는 `eventType` 문자열을 `None`으로 읽는 역직렬화기.
pub(crate) fn lenient_activity_event_type<'de, D>(
    deserializer: D,
) -> Result<Option<ActivityEventType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ActivityEventType::from_wire))
}
