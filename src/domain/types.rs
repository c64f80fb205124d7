// ==========================================
// 兽药残留合规核心 - 领域类型定义
// ==========================================
// 职责: 判定结果 / 风险分级 / 告警类别 / 给药途径 / 物种 / 残留单位
// 红线: 核心逻辑只接受枚举，不接受裸字符串
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 合规判定 (Compliance Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Pass,
    Fail,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceStatus::Pass => write!(f, "PASS"),
            ComplianceStatus::Fail => write!(f, "FAIL"),
        }
    }
}

// ==========================================
// 风险分级 (Risk Band)
// ==========================================
// 仅用于展示，不参与 Pass/Fail 判定
// 顺序: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    Low,      // ratio <= 0.5
    Medium,   // ratio <= 0.8
    High,     // ratio <= 1.0
    Critical, // ratio > 1.0 或禁用药检出
}

impl RiskBand {
    pub const LOW_MAX: f64 = 0.5;
    pub const MEDIUM_MAX: f64 = 0.8;
    pub const HIGH_MAX: f64 = 1.0;

    /// 按残留比值分级（阈值闭区间在上界）
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio <= Self::LOW_MAX {
            RiskBand::Low
        } else if ratio <= Self::MEDIUM_MAX {
            RiskBand::Medium
        } else if ratio <= Self::HIGH_MAX {
            RiskBand::High
        } else {
            RiskBand::Critical
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskBand::Low => write!(f, "LOW"),
            RiskBand::Medium => write!(f, "MEDIUM"),
            RiskBand::High => write!(f, "HIGH"),
            RiskBand::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 告警类别 / 告警级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    ComplianceFailure, // 检测超标
    HighFrequency,     // 用药频次异常
    Advisory,          // 建议类提示
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::ComplianceFailure => "COMPLIANCE_FAILURE",
            AlertKind::HighFrequency => "HIGH_FREQUENCY",
            AlertKind::Advisory => "ADVISORY",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "COMPLIANCE_FAILURE" => Ok(AlertKind::ComplianceFailure),
            "HIGH_FREQUENCY" => Ok(AlertKind::HighFrequency),
            "ADVISORY" => Ok(AlertKind::Advisory),
            other => Err(format!("未知告警类别: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Error => "ERROR",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INFO" => Ok(AlertSeverity::Info),
            "WARNING" => Ok(AlertSeverity::Warning),
            "ERROR" => Ok(AlertSeverity::Error),
            other => Err(format!("未知告警级别: {}", other)),
        }
    }
}

// ==========================================
// 限量来源 (Limit Source)
// ==========================================
// 区分参考表命中与策略默认值，默认值必须可见
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitSource {
    ExactScope,    // (substance, scope) 精确命中
    WildcardScope, // (substance, "All") 兜底命中
    PolicyDefault, // 未命中，按配置策略取默认限量
}

// ==========================================
// 检测样本生命周期
// ==========================================
// Uploaded → Evaluated → {PassRecorded | FailRecorded}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabSampleState {
    Uploaded,
    Evaluated,
    PassRecorded,
    FailRecorded,
}

impl LabSampleState {
    /// 状态推进（非法转换返回 None）
    pub fn advance(self, status: Option<ComplianceStatus>) -> Option<Self> {
        match (self, status) {
            (LabSampleState::Uploaded, _) => Some(LabSampleState::Evaluated),
            (LabSampleState::Evaluated, Some(ComplianceStatus::Pass)) => {
                Some(LabSampleState::PassRecorded)
            }
            (LabSampleState::Evaluated, Some(ComplianceStatus::Fail)) => {
                Some(LabSampleState::FailRecorded)
            }
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LabSampleState::PassRecorded | LabSampleState::FailRecorded
        )
    }
}

// ==========================================
// 给药途径 (Route)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Intramuscular,
    Intravenous,
    Subcutaneous,
    Oral,
    Intramammary,
    Topical,
    Other(String),
}

impl Route {
    /// 途径系数（十分位整数，10 = ×1.0）
    pub fn factor_tenths(&self) -> u32 {
        match self {
            Route::Intramuscular => 12,
            Route::Intravenous => 8,
            _ => 10,
        }
    }

    pub fn factor(&self) -> f64 {
        f64::from(self.factor_tenths()) / 10.0
    }
}

impl FromStr for Route {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "intramuscular" | "im" => Route::Intramuscular,
            "intravenous" | "iv" => Route::Intravenous,
            "subcutaneous" | "sc" => Route::Subcutaneous,
            "oral" => Route::Oral,
            "intramammary" => Route::Intramammary,
            "topical" => Route::Topical,
            _ => Route::Other(trimmed.to_string()),
        })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Intramuscular => write!(f, "Intramuscular"),
            Route::Intravenous => write!(f, "Intravenous"),
            Route::Subcutaneous => write!(f, "Subcutaneous"),
            Route::Oral => write!(f, "Oral"),
            Route::Intramammary => write!(f, "Intramammary"),
            Route::Topical => write!(f, "Topical"),
            Route::Other(name) => write!(f, "{}", name),
        }
    }
}

// ==========================================
// 物种 (Species)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Cattle,
    Buffalo,
    Goat,
    Sheep,
    Pig,
    Poultry,
    Other(String),
}

impl Species {
    /// 物种系数（十分位整数，10 = ×1.0）
    pub fn factor_tenths(&self) -> u32 {
        match self {
            Species::Cattle => 10,
            Species::Poultry => 7,
            _ => 11,
        }
    }

    pub fn factor(&self) -> f64 {
        f64::from(self.factor_tenths()) / 10.0
    }
}

impl FromStr for Species {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "cattle" | "cow" => Species::Cattle,
            "buffalo" => Species::Buffalo,
            "goat" => Species::Goat,
            "sheep" => Species::Sheep,
            "pig" | "swine" => Species::Pig,
            "poultry" | "chicken" => Species::Poultry,
            _ => Species::Other(trimmed.to_string()),
        })
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Cattle => write!(f, "Cattle"),
            Species::Buffalo => write!(f, "Buffalo"),
            Species::Goat => write!(f, "Goat"),
            Species::Sheep => write!(f, "Sheep"),
            Species::Pig => write!(f, "Pig"),
            Species::Poultry => write!(f, "Poultry"),
            Species::Other(name) => write!(f, "{}", name),
        }
    }
}

// ==========================================
// 残留单位 (Residue Unit)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResidueUnit {
    MgPerKg,
    UgPerKg,
}

impl ResidueUnit {
    /// 每 kg 含多少 µg
    fn micrograms(&self) -> f64 {
        match self {
            ResidueUnit::MgPerKg => 1000.0,
            ResidueUnit::UgPerKg => 1.0,
        }
    }

    /// 换算结果保留的小数位数（1e-6 µg/kg 精度）
    fn resolution(&self) -> f64 {
        match self {
            ResidueUnit::MgPerKg => 1e9,
            ResidueUnit::UgPerKg => 1e6,
        }
    }

    /// 单位换算
    ///
    /// 结果按目标单位精度取整，2.007 mg/kg 换算为 2007 µg/kg 而非 2007.0000000000002
    pub fn convert(&self, value: f64, to: ResidueUnit) -> f64 {
        if *self == to {
            return value;
        }
        let raw = value * self.micrograms() / to.micrograms();
        let scale = to.resolution();
        let rounded = (raw * scale).round() / scale;
        if rounded.is_finite() {
            rounded
        } else {
            raw
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResidueUnit::MgPerKg => "mg/kg",
            ResidueUnit::UgPerKg => "µg/kg",
        }
    }
}

impl fmt::Display for ResidueUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResidueUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mg/kg" | "ppm" => Ok(ResidueUnit::MgPerKg),
            "µg/kg" | "μg/kg" | "ug/kg" | "ppb" => Ok(ResidueUnit::UgPerKg),
            other => Err(format!("未知残留单位: {}", other)),
        }
    }
}
