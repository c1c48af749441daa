//! Snapshot normalization: text-encoded numerics become floats, idle assets are dropped.

use crate::types::require;
use crate::{
    AssetBalance, DataError, IsolatedAssetSnapshot, NormalizedAccount, RawAssetBalance,
    RawIsolatedAccount, RawIsolatedAsset,
};

/// Normalize a raw isolated margin account.
///
/// Every whitelisted numeric field must be present and parseable; the first
/// violation is returned as a [`DataError`]. Assets where neither the base nor
/// the quote side holds a strictly positive net balance are removed before
/// their remaining fields are parsed.
pub fn normalize_account(raw: &RawIsolatedAccount) -> Result<NormalizedAccount, DataError> {
    let total_net_asset_of_btc = require("totalNetAssetOfBtc", raw.total_net_asset_of_btc.as_ref())?;
    let total_asset_of_btc = require("totalAssetOfBtc", raw.total_asset_of_btc.as_ref())?;
    let total_liability_of_btc =
        require("totalLiabilityOfBtc", raw.total_liability_of_btc.as_ref())?;

    let mut assets = Vec::with_capacity(raw.assets.len());
    for asset in &raw.assets {
        if is_active(asset)? {
            assets.push(normalize_asset(asset)?);
        }
    }

    Ok(NormalizedAccount {
        total_asset_of_btc,
        total_liability_of_btc,
        total_net_asset_of_btc,
        assets,
    })
}

fn is_active(asset: &RawIsolatedAsset) -> Result<bool, DataError> {
    let base = require(
        &field_path(&asset.symbol, "baseAsset.netAsset"),
        asset.base_asset.net_asset.as_ref(),
    )?;
    let quote = require(
        &field_path(&asset.symbol, "quoteAsset.netAsset"),
        asset.quote_asset.net_asset.as_ref(),
    )?;
    Ok(base > 0.0 || quote > 0.0)
}

fn normalize_asset(asset: &RawIsolatedAsset) -> Result<IsolatedAssetSnapshot, DataError> {
    let symbol = &asset.symbol;
    let ratio = |name: &str, value: Option<&crate::RawNumber>| {
        require(&field_path(symbol, name), value)
    };

    Ok(IsolatedAssetSnapshot {
        symbol: symbol.clone(),
        base_asset: normalize_balance(symbol, "baseAsset", &asset.base_asset)?,
        quote_asset: normalize_balance(symbol, "quoteAsset", &asset.quote_asset)?,
        margin_level_status: asset.margin_level_status.clone(),
        index_price: ratio("indexPrice", asset.index_price.as_ref())?,
        margin_ratio: ratio("marginRatio", asset.margin_ratio.as_ref())?,
        liquidate_rate: ratio("liquidateRate", asset.liquidate_rate.as_ref())?,
        liquidate_price: ratio("liquidatePrice", asset.liquidate_price.as_ref())?,
        margin_level: ratio("marginLevel", asset.margin_level.as_ref())?,
    })
}

fn normalize_balance(
    symbol: &str,
    side: &str,
    balance: &RawAssetBalance,
) -> Result<AssetBalance, DataError> {
    let field = |name: &str, value: Option<&crate::RawNumber>| {
        require(&field_path(symbol, &format!("{side}.{name}")), value)
    };

    Ok(AssetBalance {
        asset: balance.asset.clone(),
        net_asset: field("netAsset", balance.net_asset.as_ref())?,
        total_asset: field("totalAsset", balance.total_asset.as_ref())?,
        interest: field("interest", balance.interest.as_ref())?,
        net_asset_of_btc: field("netAssetOfBtc", balance.net_asset_of_btc.as_ref())?,
        free: field("free", balance.free.as_ref())?,
        locked: field("locked", balance.locked.as_ref())?,
        borrowed: field("borrowed", balance.borrowed.as_ref())?,
    })
}

fn field_path(symbol: &str, name: &str) -> String {
    format!("assets[{symbol}].{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn balance(asset: &str, net: &str) -> serde_json::Value {
        json!({
            "asset": asset,
            "borrowEnabled": true,
            "repayEnabled": true,
            "netAsset": net,
            "totalAsset": net,
            "interest": "0.00000000",
            "netAssetOfBtc": "0.00010000",
            "free": net,
            "locked": "0.00000000",
            "borrowed": "0.00000000"
        })
    }

    fn asset(symbol: &str, base_net: &str, quote_net: &str) -> serde_json::Value {
        json!({
            "symbol": symbol,
            "baseAsset": balance("TOMO", base_net),
            "quoteAsset": balance("USDT", quote_net),
            "isolatedCreated": true,
            "enabled": true,
            "marginLevelStatus": "EXCESSIVE",
            "indexPrice": "1.50000000",
            "marginRatio": "5.00000000",
            "liquidateRate": "0.00000000",
            "liquidatePrice": "0.00000000",
            "marginLevel": "999.00000000"
        })
    }

    fn account(assets: Vec<serde_json::Value>) -> RawIsolatedAccount {
        serde_json::from_value(json!({
            "totalAssetOfBtc": "0.75",
            "totalLiabilityOfBtc": "0.25",
            "totalNetAssetOfBtc": "0.5",
            "assets": assets
        }))
        .unwrap()
    }

    #[test]
    fn test_text_fields_become_numbers() {
        let normalized = normalize_account(&account(vec![asset("TOMOUSDT", "10.5", "0")])).unwrap();

        assert_eq!(normalized.total_net_asset_of_btc, 0.5);
        assert_eq!(normalized.total_asset_of_btc, 0.75);
        assert_eq!(normalized.total_liability_of_btc, 0.25);

        let tomo = &normalized.assets[0];
        assert_eq!(tomo.base_asset.net_asset, 10.5);
        assert_eq!(tomo.base_asset.net_asset_of_btc, 0.0001);
        assert_eq!(tomo.index_price, 1.5);
        assert_eq!(tomo.margin_level, 999.0);
        assert_eq!(tomo.margin_level_status.as_deref(), Some("EXCESSIVE"));
    }

    #[test]
    fn test_numeric_json_values_are_accepted() {
        let mut raw = account(vec![]);
        raw.total_net_asset_of_btc = Some(crate::RawNumber::Number(1.25));
        let normalized = normalize_account(&raw).unwrap();
        assert_eq!(normalized.total_net_asset_of_btc, 1.25);
    }

    #[test]
    fn test_idle_assets_are_filtered() {
        let normalized = normalize_account(&account(vec![
            asset("TOMOUSDT", "10", "0"),
            asset("BNBUSDT", "0", "0"),
            asset("ETHUSDT", "0.00000000", "25.1"),
            asset("ADAUSDT", "-1", "-3"),
        ]))
        .unwrap();

        let symbols: Vec<&str> = normalized.assets.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TOMOUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_missing_top_level_field_fails() {
        let mut raw = account(vec![]);
        raw.total_liability_of_btc = None;

        let err = normalize_account(&raw).unwrap_err();
        assert_eq!(
            err,
            DataError::MissingField {
                field: "totalLiabilityOfBtc".to_string()
            }
        );
    }

    #[test]
    fn test_non_numeric_asset_field_fails() {
        let mut bad = asset("TOMOUSDT", "10", "0");
        bad["marginRatio"] = json!("n/a");

        let err = normalize_account(&account(vec![bad])).unwrap_err();
        assert_eq!(
            err,
            DataError::InvalidNumber {
                field: "assets[TOMOUSDT].marginRatio".to_string(),
                value: "n/a".to_string()
            }
        );
    }

    #[test]
    fn test_missing_balance_field_fails() {
        let mut bad = asset("TOMOUSDT", "10", "0");
        bad["quoteAsset"]
            .as_object_mut()
            .unwrap()
            .remove("borrowed");

        let err = normalize_account(&account(vec![bad])).unwrap_err();
        assert!(matches!(err, DataError::MissingField { field } if field == "assets[TOMOUSDT].quoteAsset.borrowed"));
    }

    #[test]
    fn test_snapshot_valued_at_reference_bid() {
        let normalized = normalize_account(&account(vec![])).unwrap();
        let snapshot = normalized.into_snapshot(1_700_000_040, 30_000.0);
        assert_eq!(snapshot.timestamp, 1_700_000_040);
        assert_eq!(snapshot.total_net_asset_of_usdt, 15_000.0);
    }
}
