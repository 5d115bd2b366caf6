//! Tag merge policy and address comparison.

use mapmerge_core::TagMap;
use mapmerge_settings::AddressKeys;

/// Tags of `dest` after absorbing `source`.
///
/// Every source tag overwrites the dest tag of the same key; dest keys the
/// source lacks are kept. For each of `mergeable_keys` that carries a
/// non-empty value on both sides the result is the union of their
/// `;`-separated tokens, see [`union_tokens`].
pub fn merge_tags(source: &TagMap, dest: &TagMap, mergeable_keys: &[String]) -> TagMap {
    let mut merged = dest.clone();
    merged.extend(source.iter().map(|(k, v)| (k.clone(), v.clone())));
    for key in mergeable_keys {
        let (Some(s), Some(d)) = (source.get(key), dest.get(key)) else {
            continue;
        };
        if !s.is_empty() && !d.is_empty() {
            merged.insert(key.clone(), union_tokens(s, d));
        }
    }
    merged
}

/// Deduplicated union of two `;`-separated values.
///
/// Source tokens come first, then dest tokens; the first occurrence of a
/// token wins. Tokens are trimmed and empty ones dropped.
pub fn union_tokens(source: &str, dest: &str) -> String {
    let mut tokens: Vec<&str> = Vec::new();
    for token in source.split(';').chain(dest.split(';')).map(str::trim) {
        if !token.is_empty() && !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens.join(";")
}

/// Two tag maps describe the same address: unit equal (both absent counts
/// as equal), house number and street present and equal.
pub fn addresses_match(a: &TagMap, b: &TagMap, keys: &AddressKeys) -> bool {
    a.get(&keys.unit) == b.get(&keys.unit)
        && present_and_equal(a, b, &keys.housenumber)
        && present_and_equal(a, b, &keys.street)
}

fn present_and_equal(a: &TagMap, b: &TagMap, key: &str) -> bool {
    match (a.get(key), b.get(key)) {
        (Some(x), Some(y)) => !x.is_empty() && x == y,
        _ => false,
    }
}
