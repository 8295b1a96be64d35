//! # 上游载荷规范化
//!
//! 上游字段类型不可信：数字可能以文本形式出现，文本也可能以数字形式出现。
//! 本模块在边界处把原始 JSON 校验为严格的 `PriceSnapshot`。
//!
//! ## 强制转换规则
//! - 价格字段统一转换为 `Decimal`；数字或数字文本均可，首尾空白会被忽略。
//! - 任一报价的价格缺失、无法解析、为负，或 `minprice > maxprice`，整个快照被拒绝。
//! - 文本字段接受字符串或数字；数字形式的 `changepercent` 补上符号前缀。
//! - 顶层 `msg`、`time`、`price` 缺失时取空文本。

use aurum_core::price::entity::{PriceQuote, PriceSnapshot};
use aurum_core::price::error::ValidationError;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::str::FromStr;

const HEALTHY_CODE: u16 = 200;

/// # Summary
/// 将上游原始 JSON 规范化为内部快照。
///
/// # Logic
/// 1. 载荷必须是对象。
/// 2. `code` 必须等于 200 (数字或数字文本)。
/// 3. `data` 必须存在且为非空数组。
/// 4. 逐条映射报价，任一条不合法即拒绝整个快照。
///
/// # Arguments
/// * `raw`: 未经校验的上游载荷。
///
/// # Returns
/// 成功返回 `PriceSnapshot`，否则返回 `ValidationError`。
pub fn normalize(raw: &Value) -> Result<PriceSnapshot, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let code = obj.get("code");
    if !is_healthy(code) {
        let shown = code.map_or_else(|| "missing".to_string(), Value::to_string);
        return Err(ValidationError::UnhealthyStatus(shown));
    }

    let items = match obj.get("data") {
        None | Some(Value::Null) => return Err(ValidationError::MissingData),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::DataNotArray),
    };
    if items.is_empty() {
        return Err(ValidationError::EmptyQuotes);
    }

    let quotes = items
        .iter()
        .enumerate()
        .map(|(index, item)| normalize_quote(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PriceSnapshot {
        status_code: HEALTHY_CODE,
        message: text_or_empty(obj, "msg"),
        fetched_at: text_or_empty(obj, "time"),
        headline_price: text_or_empty(obj, "price"),
        quotes,
    })
}

fn is_healthy(code: Option<&Value>) -> bool {
    match code {
        Some(Value::Number(n)) => n.as_u64() == Some(u64::from(HEALTHY_CODE)),
        Some(Value::String(s)) => s.trim().parse::<u16>() == Ok(HEALTHY_CODE),
        _ => false,
    }
}

fn normalize_quote(index: usize, item: &Value) -> Result<PriceQuote, ValidationError> {
    let obj = item.as_object().ok_or(ValidationError::MalformedQuote {
        index,
        field: "item",
        reason: "is not an object".to_string(),
    })?;

    let max_price = price(index, obj, "maxprice")?;
    let min_price = price(index, obj, "minprice")?;
    if min_price > max_price {
        return Err(ValidationError::MalformedQuote {
            index,
            field: "minprice",
            reason: format!("{} exceeds maxprice {}", min_price, max_price),
        });
    }

    Ok(PriceQuote {
        id: required_text(index, obj, "id")?,
        category: required_text(index, obj, "dir")?,
        title: required_text(index, obj, "title")?,
        change_percent: change_percent(index, obj)?,
        max_price,
        min_price,
        buy_price: price(index, obj, "buyprice")?,
        recycle_price: price(index, obj, "recycleprice")?,
        date: required_text(index, obj, "date")?,
    })
}

fn price(
    index: usize,
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Decimal, ValidationError> {
    let malformed = |reason: String| ValidationError::MalformedQuote {
        index,
        field,
        reason,
    };

    let parsed = match obj.get(field) {
        None | Some(Value::Null) => return Err(malformed("is missing".to_string())),
        Some(Value::Number(n)) => decimal_from_number(n),
        Some(Value::String(s)) => decimal_from_text(s.trim()),
        Some(other) => return Err(malformed(format!("has unsupported type: {}", other))),
    };

    let value = parsed.ok_or_else(|| malformed("is not numeric".to_string()))?;
    if value.is_zero() {
        // "-0" 统一为正零
        return Ok(Decimal::ZERO);
    }
    if value.is_sign_negative() {
        return Err(malformed(format!("is negative: {}", value)));
    }
    Ok(value)
}

fn decimal_from_number(n: &Number) -> Option<Decimal> {
    decimal_from_text(&n.to_string())
}

fn decimal_from_text(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn change_percent(index: usize, obj: &Map<String, Value>) -> Result<String, ValidationError> {
    match obj.get("changepercent") {
        Some(Value::Number(n)) => {
            let rendered = n.to_string();
            if rendered.starts_with('-') {
                Ok(rendered)
            } else {
                Ok(format!("+{}", rendered))
            }
        }
        _ => required_text(index, obj, "changepercent"),
    }
}

fn required_text(
    index: usize,
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<String, ValidationError> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        None | Some(Value::Null) => Err(ValidationError::MalformedQuote {
            index,
            field,
            reason: "is missing".to_string(),
        }),
        Some(other) => Err(ValidationError::MalformedQuote {
            index,
            field,
            reason: format!("has unsupported type: {}", other),
        }),
    }
}

fn text_or_empty(obj: &Map<String, Value>, field: &str) -> String {
    match obj.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "code": 200,
            "msg": "ok",
            "time": "2024-01-01 10:00",
            "price": "¥500",
            "data": [{
                "id": "1",
                "dir": "A",
                "title": "Au999",
                "changepercent": "+1.2",
                "maxprice": "510",
                "minprice": "495",
                "buyprice": "500",
                "recycleprice": "490",
                "date": "2024-01-01"
            }]
        })
    }

    #[test]
    fn test_sample_payload_coerces_prices_to_numbers() {
        let snapshot = normalize(&sample()).unwrap();
        assert_eq!(snapshot.status_code, 200);
        assert_eq!(snapshot.message, "ok");
        assert_eq!(snapshot.fetched_at, "2024-01-01 10:00");
        assert_eq!(snapshot.headline_price, "¥500");

        let quote = &snapshot.quotes[0];
        assert_eq!(quote.id, "1");
        assert_eq!(quote.category, "A");
        assert_eq!(quote.title, "Au999");
        assert_eq!(quote.change_percent, "+1.2");
        assert_eq!(quote.max_price, dec!(510));
        assert_eq!(quote.min_price, dec!(495));
        assert_eq!(quote.buy_price, dec!(500));
        assert_eq!(quote.recycle_price, dec!(490));
        assert_eq!(quote.date, "2024-01-01");
    }

    #[test]
    fn test_quote_count_and_order_preserved() {
        let mut raw = sample();
        let mut second = raw["data"][0].clone();
        second["id"] = json!(2);
        second["title"] = json!("Pt950");
        second["maxprice"] = json!(230.5);
        second["minprice"] = json!(220);
        second["buyprice"] = json!(" 225.25 ");
        second["recycleprice"] = json!(0);
        second["changepercent"] = json!(-0.35);
        raw["data"].as_array_mut().unwrap().push(second);

        let snapshot = normalize(&raw).unwrap();
        assert_eq!(snapshot.quotes.len(), raw["data"].as_array().unwrap().len());
        assert_eq!(snapshot.quotes[0].title, "Au999");

        let pt = &snapshot.quotes[1];
        assert_eq!(pt.id, "2");
        assert_eq!(pt.max_price, dec!(230.5));
        assert_eq!(pt.buy_price, dec!(225.25));
        assert_eq!(pt.recycle_price, Decimal::ZERO);
        assert_eq!(pt.change_percent, "-0.35");

        for q in &snapshot.quotes {
            for p in [q.max_price, q.min_price, q.buy_price, q.recycle_price] {
                assert!(!p.is_sign_negative());
            }
        }
    }

    #[test]
    fn test_numeric_change_percent_gets_sign_prefix() {
        let mut raw = sample();
        raw["data"][0]["changepercent"] = json!(1.2);
        let snapshot = normalize(&raw).unwrap();
        assert_eq!(snapshot.quotes[0].change_percent, "+1.2");
    }

    #[test]
    fn test_code_as_text_is_accepted() {
        let mut raw = sample();
        raw["code"] = json!("200");
        assert!(normalize(&raw).is_ok());
    }

    #[test]
    fn test_rejects_non_object() {
        assert_eq!(normalize(&json!([1, 2])), Err(ValidationError::NotAnObject));
        assert_eq!(normalize(&json!("oops")), Err(ValidationError::NotAnObject));
    }

    #[test]
    fn test_rejects_unhealthy_code() {
        let mut raw = sample();
        raw["code"] = json!(500);
        assert_eq!(
            normalize(&raw),
            Err(ValidationError::UnhealthyStatus("500".to_string()))
        );

        raw.as_object_mut().unwrap().remove("code");
        assert_eq!(
            normalize(&raw),
            Err(ValidationError::UnhealthyStatus("missing".to_string()))
        );
    }

    #[test]
    fn test_rejects_missing_or_non_array_data() {
        let mut raw = sample();
        raw.as_object_mut().unwrap().remove("data");
        assert_eq!(normalize(&raw), Err(ValidationError::MissingData));

        raw["data"] = json!({"id": "1"});
        assert_eq!(normalize(&raw), Err(ValidationError::DataNotArray));

        raw["data"] = json!([]);
        assert_eq!(normalize(&raw), Err(ValidationError::EmptyQuotes));
    }

    #[test]
    fn test_malformed_price_rejects_whole_snapshot() {
        let mut raw = sample();
        raw["data"][0]["buyprice"] = json!("¥500");
        assert!(matches!(
            normalize(&raw),
            Err(ValidationError::MalformedQuote { index: 0, field: "buyprice", .. })
        ));

        let mut raw = sample();
        raw["data"][0]["recycleprice"] = json!("");
        assert!(matches!(
            normalize(&raw),
            Err(ValidationError::MalformedQuote { field: "recycleprice", .. })
        ));
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut raw = sample();
        raw["data"][0]["maxprice"] = json!("-1");
        assert!(matches!(
            normalize(&raw),
            Err(ValidationError::MalformedQuote { field: "maxprice", .. })
        ));
    }

    #[test]
    fn test_negative_zero_price_becomes_plain_zero() {
        let mut raw = sample();
        raw["data"][0]["recycleprice"] = json!("-0");
        raw["data"][0]["buyprice"] = json!("-0.00");
        let snapshot = normalize(&raw).unwrap();

        let quote = &snapshot.quotes[0];
        assert_eq!(quote.recycle_price, Decimal::ZERO);
        assert!(!quote.recycle_price.is_sign_negative());
        assert!(!quote.buy_price.is_sign_negative());
        assert_eq!(quote.buy_price.to_string(), "0");
    }

    #[test]
    fn test_min_above_max_rejected() {
        let mut raw = sample();
        raw["data"][0]["minprice"] = json!("520");
        assert!(matches!(
            normalize(&raw),
            Err(ValidationError::MalformedQuote { field: "minprice", .. })
        ));
    }

    #[test]
    fn test_missing_text_field_rejected() {
        let mut raw = sample();
        raw["data"][0].as_object_mut().unwrap().remove("title");
        assert!(matches!(
            normalize(&raw),
            Err(ValidationError::MalformedQuote { field: "title", .. })
        ));
    }

    #[test]
    fn test_missing_top_level_text_defaults_to_empty() {
        let mut raw = sample();
        let obj = raw.as_object_mut().unwrap();
        obj.remove("msg");
        obj.remove("price");
        let snapshot = normalize(&raw).unwrap();
        assert_eq!(snapshot.message, "");
        assert_eq!(snapshot.headline_price, "");
    }
}
