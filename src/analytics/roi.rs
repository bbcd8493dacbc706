//! Product return on list price for won deals

use crate::data::{columns, table_names, Product, Tables};
use crate::error::{CrmError, Result};
use crate::types::{Money, Percentage, ProductId};
use hashbrown::HashMap;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRoi {
    pub product_id: ProductId,
    /// Catalog name; `None` when the product is not in the catalog
    pub name: Option<String>,
    pub deals: usize,
    pub total_close_value: Money,
    /// Sum of list prices over won deals; `None` when no deal matched a price
    pub total_list_price: Option<Money>,
    pub roi: Option<Percentage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoiAnalysis {
    /// Descending by ROI, undefined last
    pub products: Vec<ProductRoi>,
    /// Mean over products with a defined ROI
    pub mean_roi: Option<Percentage>,
}

impl RoiAnalysis {
    pub fn get(&self, product_id: &str) -> Option<&ProductRoi> {
        self.products.iter().find(|p| p.product_id == product_id)
    }
}

/// `(close - list) / list * 100`; undefined for a zero or non-finite list price
pub fn roi_percent(total_close_value: Money, total_list_price: Money) -> Option<Percentage> {
    if total_list_price == 0.0 || !total_list_price.is_finite() {
        return None;
    }
    let roi = (total_close_value - total_list_price) / total_list_price * 100.0;
    roi.is_finite().then_some(roi)
}

#[derive(Default)]
struct Accumulator {
    deals: usize,
    close_value: Money,
    list_price: Option<Money>,
}

/// Won deals left-joined with the catalog, aggregated per product id
pub fn analyze_roi(tables: &Tables) -> Result<RoiAnalysis> {
    if !tables.product_columns.contains(columns::SALES_PRICE) {
        return Err(CrmError::missing_column(table_names::PRODUCTS, columns::SALES_PRICE));
    }

    let mut catalog: HashMap<&str, &Product> = HashMap::new();
    for product in &tables.products {
        catalog.entry(product.product_id.as_str()).or_insert(product);
    }

    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut unassigned = 0usize;
    for deal in tables.won_deals() {
        let Some(product_id) = deal.product_id.as_deref() else {
            unassigned += 1;
            continue;
        };
        let entry = groups.entry(product_id).or_default();
        entry.deals += 1;
        entry.close_value += deal.close_value.unwrap_or(0.0);
        if let Some(price) = catalog.get(product_id).and_then(|p| p.sales_price) {
            *entry.list_price.get_or_insert(0.0) += price;
        }
    }
    if unassigned > 0 {
        log::debug!("{} won deals have no product and are left out of ROI", unassigned);
    }

    let mut products: Vec<ProductRoi> = groups
        .into_iter()
        .map(|(product_id, acc)| ProductRoi {
            product_id: product_id.to_string(),
            name: catalog.get(product_id).and_then(|p| p.name.clone()),
            deals: acc.deals,
            total_close_value: acc.close_value,
            total_list_price: acc.list_price,
            roi: acc.list_price.and_then(|list| roi_percent(acc.close_value, list)),
        })
        .collect();
    products.sort_by(|a, b| super::desc_undefined_last(a.roi, b.roi));

    let defined: Vec<f64> = products.iter().filter_map(|p| p.roi).collect();
    Ok(RoiAnalysis {
        mean_roi: super::mean(&defined),
        products,
    })
}
