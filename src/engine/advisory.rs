// ==========================================
// 兽药残留合规核心 - 市场行情提示（占位）
// ==========================================
// 说明: 无预测模型；价格取自静态表，结果显式标记 is_placeholder
// 规则: change > 2% → Hold；change < -2% → Sell；否则 Monitor
// ==========================================

use crate::i18n::{Localizer, MessageKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 静态展示置信度
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.78;

/// (commodity, current_price, forecast_price)，单位 ₹/kg
const STATIC_PRICES: &[(&str, f64, f64)] = &[
    ("Milk", 62.0, 64.0),
    ("Meat", 140.0, 135.0),
    ("Eggs", 90.0, 91.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRecommendation {
    Hold,
    Sell,
    Monitor,
}

impl MarketRecommendation {
    /// 按涨跌幅（百分比）给出建议
    pub fn from_change(change_percent: f64) -> Self {
        if change_percent > 2.0 {
            MarketRecommendation::Hold
        } else if change_percent < -2.0 {
            MarketRecommendation::Sell
        } else {
            MarketRecommendation::Monitor
        }
    }

    fn message_key(&self) -> MessageKey {
        match self {
            MarketRecommendation::Hold => MessageKey::MarketHold,
            MarketRecommendation::Sell => MessageKey::MarketSell,
            MarketRecommendation::Monitor => MessageKey::MarketMonitor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceForecast {
    pub commodity: String,
    pub region: String,
    pub current_price: f64,
    pub forecast_price: f64,
    pub change_percent: f64,
    pub confidence: f64,
    pub recommendation: MarketRecommendation,
    pub recommendation_text: String,
    pub is_placeholder: bool,
}

pub struct MarketAdvisory {
    localizer: Arc<dyn Localizer>,
}

impl MarketAdvisory {
    pub fn new(localizer: Arc<dyn Localizer>) -> Self {
        Self { localizer }
    }

    /// 行情提示；未收录的品类返回 None
    pub fn forecast(&self, commodity: &str, region: &str) -> Option<PriceForecast> {
        let key = commodity.trim();
        let (name, current, forecast) = STATIC_PRICES
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(key))?;

        // 保留 1 位小数
        let change_percent = ((forecast - current) / current * 1000.0).round() / 10.0;
        let recommendation = MarketRecommendation::from_change(change_percent);

        Some(PriceForecast {
            commodity: name.to_string(),
            region: region.trim().to_string(),
            current_price: *current,
            forecast_price: *forecast,
            change_percent,
            confidence: PLACEHOLDER_CONFIDENCE,
            recommendation,
            recommendation_text: self.localizer.render(recommendation.message_key(), &[]),
            is_placeholder: true,
        })
    }

    /// 全部静态品类
    pub fn forecast_all(&self, region: &str) -> Vec<PriceForecast> {
        STATIC_PRICES
            .iter()
            .filter_map(|(name, _, _)| self.forecast(name, region))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::RustI18nLocalizer;

    fn advisory() -> MarketAdvisory {
        MarketAdvisory::new(Arc::new(RustI18nLocalizer::new("en")))
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(MarketRecommendation::from_change(2.1), MarketRecommendation::Hold);
        assert_eq!(MarketRecommendation::from_change(2.0), MarketRecommendation::Monitor);
        assert_eq!(MarketRecommendation::from_change(-2.0), MarketRecommendation::Monitor);
        assert_eq!(MarketRecommendation::from_change(-2.1), MarketRecommendation::Sell);
    }

    #[test]
    fn test_forecast_is_deterministic_placeholder() {
        let a = advisory();
        let milk = a.forecast("milk", "Local Market").unwrap();
        assert!(milk.is_placeholder);
        assert_eq!(milk.confidence, PLACEHOLDER_CONFIDENCE);
        assert_eq!(milk.change_percent, 3.2);
        assert_eq!(milk.recommendation, MarketRecommendation::Hold);
        assert!(milk.recommendation_text.starts_with("Hold"));
        assert_eq!(a.forecast("Milk", "Local Market"), Some(milk));
        assert!(a.forecast("Wool", "Local Market").is_none());
    }

    #[test]
    fn test_forecast_all_covers_every_recommendation() {
        let all = advisory().forecast_all("Guntur");
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].recommendation, MarketRecommendation::Sell);
        assert_eq!(all[2].recommendation, MarketRecommendation::Monitor);
    }
}
