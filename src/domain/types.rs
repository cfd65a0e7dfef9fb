// ==========================================
// Pharmaflow - domain type definitions
// ==========================================
// Wire/database format: SCREAMING_SNAKE_CASE, matching the column values
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Stage group
// ==========================================
// Pipeline areas; a stage belongs to exactly one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageGroup {
    Triage,
    Production,
    Labeling,
    QualityControl,
    Shipping,
}

impl StageGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageGroup::Triage => "TRIAGE",
            StageGroup::Production => "PRODUCTION",
            StageGroup::Labeling => "LABELING",
            StageGroup::QualityControl => "QUALITY_CONTROL",
            StageGroup::Shipping => "SHIPPING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TRIAGE" => Some(StageGroup::Triage),
            "PRODUCTION" => Some(StageGroup::Production),
            "LABELING" => Some(StageGroup::Labeling),
            "QUALITY_CONTROL" => Some(StageGroup::QualityControl),
            "SHIPPING" => Some(StageGroup::Shipping),
            _ => None,
        }
    }
}

impl fmt::Display for StageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Product kind
// ==========================================
// Compounded dosage forms; drives the activity score table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductKind {
    Capsule,
    Sachet,
    PediatricLiquid,
    Lotion,
    Cream,
    Shampoo,
    Shot,
    Ovule,
    SublingualTablet,
    OilyCapsule,
    Gummy,
    Chocolate,
    Film,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Capsule => "CAPSULE",
            ProductKind::Sachet => "SACHET",
            ProductKind::PediatricLiquid => "PEDIATRIC_LIQUID",
            ProductKind::Lotion => "LOTION",
            ProductKind::Cream => "CREAM",
            ProductKind::Shampoo => "SHAMPOO",
            ProductKind::Shot => "SHOT",
            ProductKind::Ovule => "OVULE",
            ProductKind::SublingualTablet => "SUBLINGUAL_TABLET",
            ProductKind::OilyCapsule => "OILY_CAPSULE",
            ProductKind::Gummy => "GUMMY",
            ProductKind::Chocolate => "CHOCOLATE",
            ProductKind::Film => "FILM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CAPSULE" => Some(ProductKind::Capsule),
            "SACHET" => Some(ProductKind::Sachet),
            "PEDIATRIC_LIQUID" => Some(ProductKind::PediatricLiquid),
            "LOTION" => Some(ProductKind::Lotion),
            "CREAM" => Some(ProductKind::Cream),
            "SHAMPOO" => Some(ProductKind::Shampoo),
            "SHOT" => Some(ProductKind::Shot),
            "OVULE" => Some(ProductKind::Ovule),
            "SUBLINGUAL_TABLET" => Some(ProductKind::SublingualTablet),
            "OILY_CAPSULE" => Some(ProductKind::OilyCapsule),
            "GUMMY" => Some(ProductKind::Gummy),
            "CHOCOLATE" => Some(ProductKind::Chocolate),
            "FILM" => Some(ProductKind::Film),
            _ => None,
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Lab kind
// ==========================================
// Production-area labs a product type is compounded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabKind {
    CapsuleSachet,
    Pediatric,
    External,
}

impl LabKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabKind::CapsuleSachet => "CAPSULE_SACHET",
            LabKind::Pediatric => "PEDIATRIC",
            LabKind::External => "EXTERNAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CAPSULE_SACHET" => Some(LabKind::CapsuleSachet),
            "PEDIATRIC" => Some(LabKind::Pediatric),
            "EXTERNAL" => Some(LabKind::External),
            _ => None,
        }
    }
}

impl fmt::Display for LabKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Activity kind
// ==========================================
// Key into the activity score table together with stage + product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Weighing,
    Encapsulation,
    Analysis,
    Labeling,
    Conference,
    Reconference,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Weighing => "WEIGHING",
            ActivityKind::Encapsulation => "ENCAPSULATION",
            ActivityKind::Analysis => "ANALYSIS",
            ActivityKind::Labeling => "LABELING",
            ActivityKind::Conference => "CONFERENCE",
            ActivityKind::Reconference => "RECONFERENCE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WEIGHING" => Some(ActivityKind::Weighing),
            "ENCAPSULATION" => Some(ActivityKind::Encapsulation),
            "ANALYSIS" => Some(ActivityKind::Analysis),
            "LABELING" => Some(ActivityKind::Labeling),
            "CONFERENCE" => Some(ActivityKind::Conference),
            "RECONFERENCE" => Some(ActivityKind::Reconference),
            _ => None,
        }
    }

    /// Default activity recorded when the caller does not pick one explicitly.
    pub fn default_for_group(group: StageGroup) -> Self {
        match group {
            StageGroup::Triage => ActivityKind::Weighing,
            StageGroup::Production => ActivityKind::Encapsulation,
            StageGroup::Labeling => ActivityKind::Labeling,
            StageGroup::QualityControl => ActivityKind::Analysis,
            StageGroup::Shipping => ActivityKind::Conference,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Order status
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    InFlow,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::InFlow => "IN_FLOW",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN_FLOW" => Some(OrderStatus::InFlow),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Queue status
// ==========================================
// Single-active-item discipline: at most one ACTIVE order per worker outside
// the shipping stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Active,
    Pending,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Active => "ACTIVE",
            QueueStatus::Pending => "PENDING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(QueueStatus::Active),
            "PENDING" => Some(QueueStatus::Pending),
            _ => None,
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Score source
// ==========================================
// Origin tag of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreSource {
    Stage,
    Production,
    Check,
    Penalty,
    Shipping,
    Monthly,
    QualityControl,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Stage => "STAGE",
            ScoreSource::Production => "PRODUCTION",
            ScoreSource::Check => "CHECK",
            ScoreSource::Penalty => "PENALTY",
            ScoreSource::Shipping => "SHIPPING",
            ScoreSource::Monthly => "MONTHLY",
            ScoreSource::QualityControl => "QUALITY_CONTROL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STAGE" => Some(ScoreSource::Stage),
            "PRODUCTION" => Some(ScoreSource::Production),
            "CHECK" => Some(ScoreSource::Check),
            "PENALTY" => Some(ScoreSource::Penalty),
            "SHIPPING" => Some(ScoreSource::Shipping),
            "MONTHLY" => Some(ScoreSource::Monthly),
            "QUALITY_CONTROL" => Some(ScoreSource::QualityControl),
            _ => None,
        }
    }
}

impl fmt::Display for ScoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Shipping method
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingMethod {
    Motoboy,
    Sedex,
}

impl ShippingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMethod::Motoboy => "MOTOBOY",
            ShippingMethod::Sedex => "SEDEX",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MOTOBOY" => Some(ShippingMethod::Motoboy),
            "SEDEX" => Some(ShippingMethod::Sedex),
            _ => None,
        }
    }

    /// Name of the checklist item marked when a route of this method closes.
    pub fn checklist_name(&self) -> &'static str {
        match self {
            ShippingMethod::Motoboy => "MOTOBOY ROUTE",
            ShippingMethod::Sedex => "SEDEX",
        }
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Sedex counting mode
// ==========================================
// PER_DAY awards points once per worker-day; PER_DISPATCH on every dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SedexCountMode {
    PerDispatch,
    PerDay,
}

impl SedexCountMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SedexCountMode::PerDispatch => "PER_DISPATCH",
            SedexCountMode::PerDay => "PER_DAY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PER_DISPATCH" => Some(SedexCountMode::PerDispatch),
            "PER_DAY" => Some(SedexCountMode::PerDay),
            _ => None,
        }
    }
}

impl fmt::Display for SedexCountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Payout status (monthly bonus)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Cancelled,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "PENDING",
            PayoutStatus::Paid => "PAID",
            PayoutStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PayoutStatus::Pending),
            "PAID" => Some(PayoutStatus::Paid),
            "CANCELLED" => Some(PayoutStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Fixed rule application mode
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationMode {
    Automatic,
    Manual,
}

impl ApplicationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationMode::Automatic => "AUTOMATIC",
            ApplicationMode::Manual => "MANUAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUTOMATIC" => Some(ApplicationMode::Automatic),
            "MANUAL" => Some(ApplicationMode::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// QC question field kind
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QcFieldKind {
    Text,
    TextArea,
    Checkbox,
    Select,
    Number,
}

impl QcFieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcFieldKind::Text => "TEXT",
            QcFieldKind::TextArea => "TEXT_AREA",
            QcFieldKind::Checkbox => "CHECKBOX",
            QcFieldKind::Select => "SELECT",
            QcFieldKind::Number => "NUMBER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TEXT" => Some(QcFieldKind::Text),
            "TEXT_AREA" => Some(QcFieldKind::TextArea),
            "CHECKBOX" => Some(QcFieldKind::Checkbox),
            "SELECT" => Some(QcFieldKind::Select),
            "NUMBER" => Some(QcFieldKind::Number),
            _ => None,
        }
    }
}

impl fmt::Display for QcFieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Worker role
// ==========================================
// Authorization itself lives in the outer shell; the engine only needs the
// role for manager-gated operations (penalties, month close).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRole {
    Worker,
    Manager,
    Admin,
}

impl WorkerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerRole::Worker => "WORKER",
            WorkerRole::Manager => "MANAGER",
            WorkerRole::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WORKER" => Some(WorkerRole::Worker),
            "MANAGER" => Some(WorkerRole::Manager),
            "ADMIN" => Some(WorkerRole::Admin),
            _ => None,
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, WorkerRole::Manager | WorkerRole::Admin)
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Audit action
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ClaimStage,
    CompleteStage,
    ReleaseStage,
    MarkChecklist,
    ToggleQueue,
    SelectShippingMethod,
    FinalizeRoute,
    ApplyPenalty,
    RevertPenalty,
    ApplyFixedRule,
    CloseMonth,
    SubmitQcForm,
    SyncOrders,
    Other,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ClaimStage => "CLAIM_STAGE",
            AuditAction::CompleteStage => "COMPLETE_STAGE",
            AuditAction::ReleaseStage => "RELEASE_STAGE",
            AuditAction::MarkChecklist => "MARK_CHECKLIST",
            AuditAction::ToggleQueue => "TOGGLE_QUEUE",
            AuditAction::SelectShippingMethod => "SELECT_SHIPPING_METHOD",
            AuditAction::FinalizeRoute => "FINALIZE_ROUTE",
            AuditAction::ApplyPenalty => "APPLY_PENALTY",
            AuditAction::RevertPenalty => "REVERT_PENALTY",
            AuditAction::ApplyFixedRule => "APPLY_FIXED_RULE",
            AuditAction::CloseMonth => "CLOSE_MONTH",
            AuditAction::SubmitQcForm => "SUBMIT_QC_FORM",
            AuditAction::SyncOrders => "SYNC_ORDERS",
            AuditAction::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CLAIM_STAGE" => Some(AuditAction::ClaimStage),
            "COMPLETE_STAGE" => Some(AuditAction::CompleteStage),
            "RELEASE_STAGE" => Some(AuditAction::ReleaseStage),
            "MARK_CHECKLIST" => Some(AuditAction::MarkChecklist),
            "TOGGLE_QUEUE" => Some(AuditAction::ToggleQueue),
            "SELECT_SHIPPING_METHOD" => Some(AuditAction::SelectShippingMethod),
            "FINALIZE_ROUTE" => Some(AuditAction::FinalizeRoute),
            "APPLY_PENALTY" => Some(AuditAction::ApplyPenalty),
            "REVERT_PENALTY" => Some(AuditAction::RevertPenalty),
            "APPLY_FIXED_RULE" => Some(AuditAction::ApplyFixedRule),
            "CLOSE_MONTH" => Some(AuditAction::CloseMonth),
            "SUBMIT_QC_FORM" => Some(AuditAction::SubmitQcForm),
            "SYNC_ORDERS" => Some(AuditAction::SyncOrders),
            "OTHER" => Some(AuditAction::Other),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
