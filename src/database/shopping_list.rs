use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::constants::SHOPPING_LIST_FILENAME_SUFFIX;

use super::schema::{CartItemRow, ShoppingListItem};

/// Groups cart rows by ingredient identity (name, measurement unit) and
/// sums the amounts within each group. The map key keeps the output
/// ordered by ingredient name.
pub fn aggregate_cart_items(rows: Vec<CartItemRow>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    rows.into_iter().for_each(|row| {
        *totals
            .entry((row.name, row.measurement_unit))
            .or_insert(0) += i64::from(row.amount);
    });

    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListItem {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

/// Flat-text document: a dated header addressed to the requesting user,
/// then one numbered line per ingredient group.
pub fn render_shopping_list(
    username: &str,
    generated_at: DateTime<Local>,
    items: &[ShoppingListItem],
) -> String {
    let mut document = format!(
        "Date: {}\nTime: {}\n\n{}, items to buy:\n",
        generated_at.format("%d/%m/%Y"),
        generated_at.format("%H:%M:%S"),
        username
    );

    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(
            document,
            "{}. {} - {} {}.",
            i + 1,
            item.name,
            item.total,
            item.measurement_unit
        );
    }

    document
}

pub fn shopping_list_filename(username: &str) -> String {
    format!("{username}{SHOPPING_LIST_FILENAME_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(name: &str, unit: &str, amount: i32) -> CartItemRow {
        CartItemRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn amounts_merge_across_recipes() {
        // recipe A: flour 100 g + eggs 2 pcs, recipe B: flour 50 g
        let items = aggregate_cart_items(vec![
            row("flour", "g", 100),
            row("eggs", "pcs", 2),
            row("flour", "g", 50),
        ]);

        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: String::from("eggs"),
                    measurement_unit: String::from("pcs"),
                    total: 2,
                },
                ShoppingListItem {
                    name: String::from("flour"),
                    measurement_unit: String::from("g"),
                    total: 150,
                },
            ]
        );
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let items = aggregate_cart_items(vec![
            row("ginger", "g", 30),
            row("ginger", "pcs", 1),
        ]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].total, 30);
        assert_eq!(items[1].total, 1);
    }

    #[test]
    fn output_is_ordered_by_ingredient_name() {
        let items = aggregate_cart_items(vec![
            row("salt", "g", 5),
            row("butter", "g", 20),
            row("milk", "ml", 300),
        ]);

        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["butter", "milk", "salt"]);
    }

    #[test]
    fn empty_cart_aggregates_to_nothing() {
        assert!(aggregate_cart_items(vec![]).is_empty());
    }

    #[test]
    fn document_lines_follow_the_numbered_format() {
        let generated = Local.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap();
        let items = aggregate_cart_items(vec![row("flour", "g", 100), row("flour", "g", 50)]);

        let document = render_shopping_list("carla", generated, &items);

        assert!(document.starts_with("Date: 17/05/2024\nTime: 09:30:00\n\ncarla, items to buy:\n"));
        assert!(document.contains("1. flour - 150 g.\n"));
    }

    #[test]
    fn filename_is_derived_from_the_username() {
        assert_eq!(shopping_list_filename("carla"), "carla_items_to_buy.txt");
    }
}
