use crate::buckets::{month_key, quarter_key, quarter_labels};
use crate::types::{
    AggregateRow, CorrelationMatrix, DerivedRow, ProfitRow, ReturnImpact, SalesRecord,
    VolatilityPoint,
};
use crate::util::{mean, pearson, round2, sample_std_dev};
use std::collections::{BTreeMap, HashMap};

pub const CORRELATION_LABELS: [&str; 4] = ["Discount", "Return Impact", "Revenue", "Price"];

/// Group `data` by `key` and reduce each group: volumes and revenue summed,
/// price and discount averaged, all rounded to 2 dp afterwards.
///
/// One row per key actually present, ordered by key ascending.
pub fn aggregate_by<F>(data: &[SalesRecord], key: F) -> Vec<AggregateRow>
where
    F: Fn(&SalesRecord) -> String,
{
    #[derive(Default)]
    struct Acc {
        units_sold: i64,
        units_returned: i64,
        revenue: f64,
        prices: Vec<f64>,
        discounts: Vec<f64>,
    }

    let mut map: BTreeMap<String, Acc> = BTreeMap::new();
    for r in data {
        let e = map.entry(key(r)).or_default();
        e.units_sold += r.units_sold;
        e.units_returned += r.units_returned;
        e.revenue += r.revenue;
        e.prices.push(r.price);
        e.discounts.push(r.discount);
    }

    map.into_iter()
        .map(|(key, acc)| AggregateRow {
            key,
            units_sold: acc.units_sold,
            revenue: round2(acc.revenue),
            units_returned: acc.units_returned,
            price: round2(mean(&acc.prices)),
            discount: round2(mean(&acc.discounts)),
        })
        .collect()
}

pub fn monthly_summary(data: &[SalesRecord]) -> Vec<AggregateRow> {
    aggregate_by(data, |r| month_key(r.date))
}

pub fn quarterly_summary(data: &[SalesRecord]) -> Vec<AggregateRow> {
    aggregate_by(data, |r| quarter_key(r.date))
}

/// Monthly summary of one category's records.
pub fn category_monthly(data: &[SalesRecord], category: &str) -> Vec<AggregateRow> {
    let subset: Vec<SalesRecord> = data
        .iter()
        .filter(|r| r.category == category)
        .cloned()
        .collect();
    monthly_summary(&subset)
}

/// Monthly summaries for each category, in the order given.
pub fn category_summaries(
    data: &[SalesRecord],
    categories: &[String],
) -> Vec<(String, Vec<AggregateRow>)> {
    categories
        .iter()
        .map(|c| (c.clone(), category_monthly(data, c)))
        .collect()
}

/// Quarterly discount volatility: sample std dev of the discount within each
/// quarter, scaled to percentage points.
///
/// Always four points, one per quarter of `year`. Quarters with fewer than two
/// records (including none) report 0.
pub fn discount_volatility(data: &[SalesRecord], year: i32) -> Vec<VolatilityPoint> {
    let mut by_quarter: HashMap<String, Vec<f64>> = HashMap::new();
    for r in data {
        by_quarter.entry(quarter_key(r.date)).or_default().push(r.discount);
    }
    quarter_labels(year)
        .into_iter()
        .map(|quarter| {
            let sd = by_quarter
                .get(&quarter)
                .and_then(|v| sample_std_dev(v))
                .unwrap_or(0.0);
            VolatilityPoint {
                quarter,
                volatility: sd * 100.0,
            }
        })
        .collect()
}

pub fn return_impact(units_sold: i64, units_returned: i64) -> ReturnImpact {
    if units_sold == 0 {
        return ReturnImpact::Undefined {
            reason: "no units sold",
        };
    }
    ReturnImpact::Value(units_returned as f64 / units_sold as f64 * 100.0)
}

pub fn profit_per_unit(units_sold: i64, units_returned: i64, price: f64, discount: f64) -> f64 {
    (units_sold - units_returned) as f64 * (price - discount)
}

/// Extend each monthly row with return impact and profit per unit. Reads only
/// the aggregated fields.
pub fn derive_metrics(monthly: &[AggregateRow]) -> Vec<DerivedRow> {
    monthly
        .iter()
        .map(|row| DerivedRow {
            aggregate: row.clone(),
            return_impact: return_impact(row.units_sold, row.units_returned),
            profit_per_unit: profit_per_unit(
                row.units_sold,
                row.units_returned,
                row.price,
                row.discount,
            ),
        })
        .collect()
}

pub fn profit_table(derived: &[DerivedRow]) -> Vec<ProfitRow> {
    derived
        .iter()
        .map(|d| ProfitRow {
            month: d.aggregate.key.clone(),
            profit_per_unit: d.profit_per_unit,
        })
        .collect()
}

/// Pearson matrix over the monthly series of [`CORRELATION_LABELS`].
///
/// Each pair uses only months where both values are defined, so a month with
/// undefined return impact still counts for the other pairs.
pub fn correlation_matrix(derived: &[DerivedRow]) -> CorrelationMatrix {
    let series: [Vec<Option<f64>>; 4] = [
        derived.iter().map(|d| Some(d.aggregate.discount)).collect(),
        derived.iter().map(|d| d.return_impact.value()).collect(),
        derived.iter().map(|d| Some(d.aggregate.revenue)).collect(),
        derived.iter().map(|d| Some(d.aggregate.price)).collect(),
    ];

    let mut values = [[None; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            let (xs, ys): (Vec<f64>, Vec<f64>) = series[i]
                .iter()
                .zip(&series[j])
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .unzip();
            values[i][j] = pearson(&xs, &ys);
        }
    }
    CorrelationMatrix {
        labels: CORRELATION_LABELS,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(date: &str, category: &str, sold: i64, returned: i64, price: f64, discount: f64, revenue: f64) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            platform: "Walmart".to_string(),
            region: "Canada".to_string(),
            category: category.to_string(),
            units_sold: sold,
            units_returned: returned,
            price,
            discount,
            revenue,
        }
    }

    fn twelve_months() -> Vec<SalesRecord> {
        (1..=12)
            .map(|m| {
                rec(
                    &format!("2024-{:02}-15", m),
                    "Vitamin",
                    100,
                    5,
                    10.0,
                    1.0,
                    100.0 * m as f64 + 0.5,
                )
            })
            .collect()
    }

    #[test]
    fn monthly_sums_and_means_cover_exactly_their_bucket() {
        let data = vec![
            rec("2024-01-01", "Vitamin", 10, 1, 10.0, 0.10, 100.0),
            rec("2024-01-20", "Mineral", 30, 2, 20.0, 0.20, 600.0),
            rec("2024-02-03", "Vitamin", 5, 0, 7.5, 0.05, 37.5),
        ];
        let monthly = monthly_summary(&data);
        assert_eq!(monthly.len(), 2);

        let jan = &monthly[0];
        assert_eq!(jan.key, "2024-01");
        assert_eq!(jan.units_sold, 40);
        assert_eq!(jan.units_returned, 3);
        assert_eq!(jan.revenue, 700.0);
        assert_eq!(jan.price, 15.0);
        assert_eq!(jan.discount, 0.15);

        let feb = &monthly[1];
        assert_eq!(feb.key, "2024-02");
        assert_eq!(feb.units_sold, 5);
        assert_eq!(feb.revenue, 37.5);
    }

    #[test]
    fn rounding_happens_after_aggregation() {
        // Each value rounds down on its own; the sum must not.
        let data = vec![
            rec("2024-01-01", "Vitamin", 1, 0, 1.004, 0.0, 1.004),
            rec("2024-01-02", "Vitamin", 1, 0, 1.004, 0.0, 1.004),
        ];
        let monthly = monthly_summary(&data);
        assert_eq!(monthly[0].revenue, 2.01);
        assert_eq!(monthly[0].price, 1.0);
    }

    #[test]
    fn exact_half_cent_means_round_to_even() {
        let data = vec![rec("2024-03-04", "Vitamin", 4, 0, 10.125, 0.125, 40.5)];
        let monthly = monthly_summary(&data);
        assert_eq!(monthly[0].price, 10.12);
        assert_eq!(monthly[0].discount, 0.12);
    }

    #[test]
    fn twelve_monthly_records_make_three_per_quarter() {
        let data = twelve_months();
        let monthly = monthly_summary(&data);
        assert_eq!(monthly.len(), 12);
        for (row, r) in monthly.iter().zip(&data) {
            assert_eq!(row.revenue, r.revenue);
            assert_eq!(row.units_sold, 100);
            assert_eq!(row.units_returned, 5);
        }

        let quarterly = quarterly_summary(&data);
        let keys: Vec<&str> = quarterly.iter().map(|q| q.key.as_str()).collect();
        assert_eq!(keys, ["2024Q1", "2024Q2", "2024Q3", "2024Q4"]);
        for q in &quarterly {
            assert_eq!(q.units_sold, 300);
            assert_eq!(q.units_returned, 15);
            assert_eq!(q.price, 10.0);
            assert_eq!(q.discount, 1.0);
        }
        assert_eq!(quarterly[0].revenue, 100.5 + 200.5 + 300.5);
    }

    #[test]
    fn empty_buckets_are_absent() {
        let data = vec![
            rec("2024-01-10", "Vitamin", 1, 0, 1.0, 0.0, 1.0),
            rec("2024-11-10", "Vitamin", 1, 0, 1.0, 0.0, 1.0),
        ];
        let quarterly = quarterly_summary(&data);
        let keys: Vec<&str> = quarterly.iter().map(|q| q.key.as_str()).collect();
        assert_eq!(keys, ["2024Q1", "2024Q4"]);
    }

    #[test]
    fn category_summaries_follow_requested_order() {
        let data = vec![
            rec("2024-01-10", "Protein", 4, 0, 30.0, 0.1, 120.0),
            rec("2024-01-11", "Vitamin", 2, 0, 10.0, 0.1, 20.0),
            rec("2024-02-11", "Vitamin", 3, 1, 10.0, 0.2, 30.0),
        ];
        let cats: Vec<String> = ["Vitamin", "Mineral", "Protein"].iter().map(|s| s.to_string()).collect();
        let out = category_summaries(&data, &cats);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].0, "Vitamin");
        assert_eq!(out[0].1.len(), 2);
        assert!(out[1].1.is_empty());
        assert_eq!(out[2].1[0].units_sold, 4);
    }

    #[test]
    fn volatility_always_has_four_quarters() {
        let data = vec![
            rec("2024-01-10", "Vitamin", 1, 0, 1.0, 0.10, 1.0),
            rec("2024-02-10", "Vitamin", 1, 0, 1.0, 0.20, 1.0),
            rec("2024-03-10", "Vitamin", 1, 0, 1.0, 0.30, 1.0),
            rec("2024-08-10", "Vitamin", 1, 0, 1.0, 0.25, 1.0),
        ];
        let vol = discount_volatility(&data, 2024);
        assert_eq!(vol.len(), 4);
        assert_eq!(vol[0].quarter, "2024Q1");
        assert!((vol[0].volatility - 10.0).abs() < 1e-9);
        // Q2 has no data, Q3 a single record.
        assert_eq!(vol[1].volatility, 0.0);
        assert_eq!(vol[2].volatility, 0.0);
        assert_eq!(vol[3].volatility, 0.0);

        assert_eq!(discount_volatility(&[], 2024).len(), 4);
    }

    #[test]
    fn profit_per_unit_uses_net_units_and_net_price() {
        assert_eq!(profit_per_unit(100, 10, 20.0, 2.0), 1620.0);
    }

    #[test]
    fn zero_sales_give_undefined_return_impact() {
        assert_eq!(
            return_impact(0, 0),
            ReturnImpact::Undefined {
                reason: "no units sold"
            }
        );
        assert_eq!(return_impact(0, 0).value(), None);
        assert_eq!(return_impact(200, 0), ReturnImpact::Value(0.0));
        assert_eq!(return_impact(200, 10), ReturnImpact::Value(5.0));
    }

    #[test]
    fn derived_rows_keep_the_aggregate_untouched() {
        let monthly = vec![
            AggregateRow {
                key: "2024-01".to_string(),
                units_sold: 100,
                revenue: 2000.0,
                units_returned: 10,
                price: 20.0,
                discount: 2.0,
            },
            AggregateRow {
                key: "2024-02".to_string(),
                units_sold: 0,
                revenue: 0.0,
                units_returned: 0,
                price: 20.0,
                discount: 2.0,
            },
        ];
        let derived = derive_metrics(&monthly);
        assert_eq!(derived.len(), 2);
        assert_eq!(derived[0].aggregate, monthly[0]);
        assert_eq!(derived[0].return_impact, ReturnImpact::Value(10.0));
        assert_eq!(derived[0].profit_per_unit, 1620.0);
        assert_eq!(derived[1].return_impact.value(), None);
        assert_eq!(derived[1].profit_per_unit, 0.0);

        let profit = profit_table(&derived);
        assert_eq!(profit[0].month, "2024-01");
        assert_eq!(profit[0].profit_per_unit, 1620.0);
    }

    #[test]
    fn correlation_skips_undefined_months_pairwise() {
        let mk = |key: &str, sold: i64, returned: i64, revenue: f64, price: f64, discount: f64| AggregateRow {
            key: key.to_string(),
            units_sold: sold,
            revenue,
            units_returned: returned,
            price,
            discount,
        };
        let monthly = vec![
            mk("2024-01", 100, 1, 100.0, 10.0, 0.1),
            mk("2024-02", 100, 2, 200.0, 10.0, 0.2),
            mk("2024-03", 0, 0, 300.0, 10.0, 0.3),
            mk("2024-04", 100, 4, 400.0, 10.0, 0.4),
        ];
        let m = correlation_matrix(&derive_metrics(&monthly));
        assert_eq!(m.labels, CORRELATION_LABELS);
        // discount vs revenue over all four months
        assert!((m.values[0][2].unwrap() - 1.0).abs() < 1e-9);
        // discount vs return impact over the three months with sales
        assert!((m.values[0][1].unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(m.values[0][1], m.values[1][0]);
        // constant price
        assert_eq!(m.values[3][0], None);
        assert_eq!(m.values[3][3], None);
        assert!((m.values[2][2].unwrap() - 1.0).abs() < 1e-9);
    }
}
