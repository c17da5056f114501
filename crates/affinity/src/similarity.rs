//! Item-by-item similarity matrices.
//!
//! Both sources are built over the same [`ItemIndex`] so they can be blended
//! cell by cell.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use retailsense_core::stats::cosine_similarity;
use retailsense_core::{AnalyticsError, AnalyticsResult, CatalogItem, ItemId, OrderSummary, StandardScaler};

/// Ordered item ids and their matrix positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemIndex {
    ids: Vec<ItemId>,
}

impl ItemIndex {
    /// Sorts and dedupes `ids`.
    pub fn new(mut ids: Vec<ItemId>) -> Self {
        ids.sort();
        ids.dedup();
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn id(&self, position: usize) -> ItemId {
        self.ids[position]
    }

    pub fn position(&self, item_id: ItemId) -> Option<usize> {
        self.ids.binary_search(&item_id).ok()
    }
}

/// Dense square matrix, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.size + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.size + col] = value;
    }

    fn add(&mut self, row: usize, col: usize, delta: f64) {
        self.values[row * self.size + col] += delta;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.size..(row + 1) * self.size]
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// `wa * a + wb * b`. Both must share the same index.
    pub fn blend(a: &Self, wa: f64, b: &Self, wb: f64) -> AnalyticsResult<Self> {
        if a.size != b.size {
            return Err(AnalyticsError::computation(format!(
                "cannot blend {}x{} with {}x{}",
                a.size, a.size, b.size, b.size
            )));
        }
        Ok(Self {
            size: a.size,
            values: a.values.iter().zip(&b.values).map(|(x, y)| wa * x + wb * y).collect(),
        })
    }

    /// Other positions in `row` ordered by score descending, ties by position.
    pub fn ranked_neighbors(&self, row: usize) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = self
            .row(row)
            .iter()
            .copied()
            .enumerate()
            .filter(|(j, _)| *j != row)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

/// Row-normalized co-occurrence counts over counted orders.
///
/// Every pair of lines in an order counts, so an item repeated on several
/// lines weighs more in that order. Returns `None` with fewer than two items
/// or no orders.
pub fn co_purchase_matrix<'a>(
    index: &ItemIndex,
    orders: impl IntoIterator<Item = &'a OrderSummary>,
) -> Option<(SimilarityMatrix, usize)> {
    if index.len() < 2 {
        return None;
    }

    let mut counts = SimilarityMatrix::zeros(index.len());
    let mut analyzed = 0usize;
    for order in orders {
        analyzed += 1;
        let positions: Vec<usize> = order.lines.iter().filter_map(|id| index.position(*id)).collect();
        for (i, &a) in positions.iter().enumerate() {
            for &b in &positions[i..] {
                counts.add(a, b, 1.0);
                if a != b {
                    counts.add(b, a, 1.0);
                }
            }
        }
    }
    if analyzed == 0 {
        return None;
    }

    let size = counts.size;
    for row in 0..size {
        let sum: f64 = counts.row(row).iter().sum();
        let divisor = if sum == 0.0 { 1.0 } else { sum };
        for col in 0..size {
            let v = counts.get(row, col) / divisor;
            counts.set(row, col, v);
        }
    }
    Some((counts, analyzed))
}

/// Numeric encoding of one catalog item's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFeatures {
    pub category: String,
    pub brand: String,
    pub demographic: String,
    pub season: String,
    pub price: f64,
}

impl ContentFeatures {
    const ATTRIBUTES: usize = 4;

    fn attribute(&self, slot: usize) -> &str {
        match slot {
            0 => &self.category,
            1 => &self.brand,
            2 => &self.demographic,
            _ => &self.season,
        }
    }

    pub fn from_item(item: &CatalogItem) -> Self {
        fn or(value: &Option<String>, default: &str) -> String {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        }
        Self {
            category: or(&item.category, "none"),
            brand: or(&item.brand, "none"),
            demographic: or(&item.target_demographic, "unisex"),
            season: or(&item.season, "all"),
            price: item.price,
        }
    }
}

/// Cosine similarity over one-hot attributes plus standardized price.
/// Negative cosines are clamped to zero. `None` with fewer than two items.
pub fn content_matrix(items: &[ContentFeatures]) -> AnalyticsResult<Option<SimilarityMatrix>> {
    if items.len() < 2 {
        return Ok(None);
    }

    let prices: Vec<Vec<f64>> = items.iter().map(|i| vec![i.price]).collect();
    let scaler = StandardScaler::fit(&prices)?;
    let scaled = scaler.transform(&prices)?;

    // One column per distinct (attribute, value), in sorted order.
    let mut columns: BTreeMap<(usize, &str), usize> = BTreeMap::new();
    for slot in 0..ContentFeatures::ATTRIBUTES {
        let values: BTreeSet<&str> = items.iter().map(|i| i.attribute(slot)).collect();
        for v in values {
            let next = columns.len();
            columns.insert((slot, v), next);
        }
    }

    let width = columns.len() + 1;
    let vectors: Vec<Vec<f64>> = items
        .iter()
        .zip(&scaled)
        .map(|(item, price)| {
            let mut v = vec![0.0; width];
            v[0] = price[0];
            for slot in 0..ContentFeatures::ATTRIBUTES {
                if let Some(col) = columns.get(&(slot, item.attribute(slot))) {
                    v[col + 1] = 1.0;
                }
            }
            v
        })
        .collect();

    let n = vectors.len();
    let mut out = SimilarityMatrix::zeros(n);
    for i in 0..n {
        for j in i..n {
            let s = cosine_similarity(&vectors[i], &vectors[j]).clamp(0.0, 1.0);
            out.set(i, j, s);
            out.set(j, i, s);
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use retailsense_core::{CustomerId, OrderId};

    fn id(n: u128) -> ItemId {
        ItemId::from_u128(n)
    }

    fn order(n: u128, items: &[u128]) -> OrderSummary {
        OrderSummary {
            order_id: OrderId::from_u128(n),
            customer_id: CustomerId::from_u128(1),
            created_at: Utc::now(),
            total: 10.0,
            quantity: items.len() as u64,
            items: items.iter().map(|i| id(*i)).collect(),
            lines: items.iter().map(|i| id(*i)).collect(),
        }
    }

    fn features(category: &str, brand: &str, price: f64) -> ContentFeatures {
        ContentFeatures {
            category: category.into(),
            brand: brand.into(),
            demographic: "unisex".into(),
            season: "all".into(),
            price,
        }
    }

    fn distinct(category: &str, brand: &str, demographic: &str, season: &str, price: f64) -> ContentFeatures {
        ContentFeatures {
            category: category.into(),
            brand: brand.into(),
            demographic: demographic.into(),
            season: season.into(),
            price,
        }
    }

    #[test]
    fn co_purchase_rows_are_normalized_fractions() {
        let index = ItemIndex::new(vec![id(1), id(2), id(3)]);
        let orders = [order(1, &[1, 2]), order(2, &[1, 3]), order(3, &[1])];
        let (m, analyzed) = co_purchase_matrix(&index, &orders).unwrap();

        assert_eq!(analyzed, 3);
        // item 1: self x3, with 2 x1, with 3 x1
        assert!((m.get(0, 0) - 0.6).abs() < 1e-12);
        assert!((m.get(0, 1) - 0.2).abs() < 1e-12);
        for row in 0..3 {
            let sum: f64 = m.row(row).iter().sum();
            assert!(sum <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn repeated_lines_weigh_more_within_an_order() {
        let index = ItemIndex::new(vec![id(1), id(2)]);
        // lines: 1, 1, 2
        let (m, _) = co_purchase_matrix(&index, &[order(1, &[1, 1, 2])]).unwrap();
        // item 1: self x3, with 2 x2
        assert!((m.get(0, 0) - 0.6).abs() < 1e-12);
        assert!((m.get(0, 1) - 0.4).abs() < 1e-12);
        // item 2: with 1 x2, self x1
        assert!((m.get(1, 0) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn co_purchase_needs_orders_and_two_items() {
        let index = ItemIndex::new(vec![id(1), id(2)]);
        assert!(co_purchase_matrix(&index, &[]).is_none());
        let single = ItemIndex::new(vec![id(1)]);
        assert!(co_purchase_matrix(&single, &[order(1, &[1])]).is_none());
    }

    #[test]
    fn unrelated_items_score_zero_on_content() {
        let items = [
            distinct("shoes", "acme", "women", "summer", 10.0),
            distinct("hats", "zenith", "men", "winter", 20.0),
        ];
        let m = content_matrix(&items).unwrap().unwrap();
        assert_eq!(m.get(0, 1), 0.0);
        assert!((m.get(0, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn shared_attributes_raise_content_similarity() {
        let items = [
            features("shoes", "acme", 10.0),
            features("shoes", "acme", 12.0),
            features("hats", "zenith", 11.0),
        ];
        let m = content_matrix(&items).unwrap().unwrap();
        assert!(m.get(0, 1) > m.get(0, 2));
        assert_eq!(m.get(0, 1), m.get(1, 0));
    }

    #[test]
    fn missing_attributes_use_defaults() {
        let item = CatalogItem {
            item_id: id(1),
            name: String::new(),
            category: None,
            brand: Some("  ".into()),
            target_demographic: None,
            season: None,
            price: 5.0,
            active: true,
            stock_by_variant: Vec::new(),
        };
        let f = ContentFeatures::from_item(&item);
        assert_eq!(f.category, "none");
        assert_eq!(f.brand, "none");
        assert_eq!(f.demographic, "unisex");
        assert_eq!(f.season, "all");
    }

    #[test]
    fn ranked_neighbors_exclude_self_and_break_ties_by_position() {
        let index = ItemIndex::new(vec![id(1), id(2), id(3)]);
        let (m, _) = co_purchase_matrix(&index, &[order(1, &[1, 2, 3])]).unwrap();
        let ranked = m.ranked_neighbors(0);
        assert_eq!(ranked.iter().map(|(j, _)| *j).collect::<Vec<_>>(), vec![1, 2]);
    }
}
