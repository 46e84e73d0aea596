use pretty_assertions::assert_eq;
use tabular_model::{EntityId, FormulaProperty, Model, TableId};
use tabular_refs::{resolve_property, tokenize, Edge};

/// Sales(Amount, Cost; Total) and Dates(Year; Total2).
fn sample_model() -> (Model, TableId, TableId) {
    let mut model = Model::new();
    let sales = model.add_table("Sales").unwrap();
    let dates = model.add_table("Dates").unwrap();
    model.add_column(sales, "Amount").unwrap();
    model.add_column(sales, "Cost").unwrap();
    model.add_column(dates, "Year").unwrap();
    model
        .add_measure(sales, "Total", "SUM('Sales'[Amount])")
        .unwrap();
    model.add_measure(dates, "Total2", "[Total] * 2").unwrap();
    (model, sales, dates)
}

fn resolve(model: &Model, owning_table: Option<TableId>, text: &str) -> Vec<Edge> {
    let tokens = tokenize(text);
    resolve_property(model, owning_table, FormulaProperty::Expression, &tokens)
}

#[test]
fn qualified_column_reference_yields_one_column_edge() {
    let (model, sales, dates) = sample_model();
    let amount = model.column_in_table(sales, "Amount").unwrap();

    let text = "SUM('Sales'[Amount])";
    let edges = resolve(&model, Some(dates), text);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target, EntityId::Column(amount));
    assert!(!edges[0].is_table_ref);
    assert_eq!(&text[edges[0].start..edges[0].end], "[Amount]");
}

#[test]
fn qualified_measure_reference_resolves_within_the_named_table() {
    let (model, sales, dates) = sample_model();
    let total = model.measure_in_table(sales, "Total").unwrap();

    let edges = resolve(&model, Some(dates), "'Sales'[Total]");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target, EntityId::Measure(total));
}

#[test]
fn qualified_lookup_does_not_fall_back_to_owning_table() {
    let (model, sales, _) = sample_model();

    // `Amount` exists in the owning table (Sales) but not in Dates; the
    // qualified reference resolves only within Dates and emits nothing.
    let edges = resolve(&model, Some(sales), "'Dates'[Amount]");
    assert!(edges.is_empty());
}

#[test]
fn standalone_table_reference_flushes_on_following_token() {
    let (model, sales, dates) = sample_model();

    let text = "COUNTROWS(Sales)";
    let edges = resolve(&model, Some(dates), text);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target, EntityId::Table(sales));
    assert!(edges[0].is_table_ref);
    assert_eq!(&text[edges[0].start..edges[0].end], "Sales");
}

#[test]
fn pending_table_reference_flushes_at_end_of_scan() {
    let (model, sales, dates) = sample_model();

    let edges = resolve(&model, Some(dates), "Sales");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target, EntityId::Table(sales));
}

#[test]
fn pending_table_emitted_before_being_overwritten() {
    let (model, sales, dates) = sample_model();

    let edges = resolve(&model, None, "Sales Dates");
    assert_eq!(
        edges.iter().map(|e| e.target).collect::<Vec<_>>(),
        vec![EntityId::Table(sales), EntityId::Table(dates)]
    );
}

#[test]
fn unqualified_name_prefers_owning_table_column_then_measure() {
    let (model, sales, _) = sample_model();
    let amount = model.column_in_table(sales, "Amount").unwrap();
    let total = model.measure_in_table(sales, "Total").unwrap();

    let edges = resolve(&model, Some(sales), "[Amount] + [Total]");
    assert_eq!(
        edges.iter().map(|e| e.target).collect::<Vec<_>>(),
        vec![EntityId::Column(amount), EntityId::Measure(total)]
    );
}

#[test]
fn unqualified_measure_falls_back_across_tables_in_declaration_order() {
    let mut model = Model::new();
    let a = model.add_table("A").unwrap();
    let b = model.add_table("B").unwrap();
    let c = model.add_table("C").unwrap();
    model.add_measure(b, "Dup", "1").unwrap();
    model.add_measure(a, "Dup", "2").unwrap();
    let winner = model.measure_in_table(a, "Dup").unwrap();

    // Repeated rebuilds resolve the ambiguous reference identically: table
    // A is declared first, so its measure wins.
    for _ in 0..3 {
        let edges = resolve(&model, Some(c), "[Dup]");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, EntityId::Measure(winner));
    }
}

#[test]
fn unresolved_names_produce_no_edges() {
    let (model, _, dates) = sample_model();

    let edges = resolve(&model, Some(dates), "VAR x = [Nope] RETURN x + Missing(1)");
    assert!(edges.is_empty());
}

#[test]
fn string_literal_contents_are_not_references() {
    let (model, sales, _) = sample_model();
    let amount = model.column_in_table(sales, "Amount").unwrap();

    let edges = resolve(&model, Some(sales), "[Amount] & \" uses [Cost] and Sales \"");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target, EntityId::Column(amount));
}

#[test]
fn lookup_normalizes_case_and_quoting() {
    let (model, sales, dates) = sample_model();
    let amount = model.column_in_table(sales, "Amount").unwrap();

    let edges = resolve(&model, Some(dates), "sum('sales'[AMOUNT])");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target, EntityId::Column(amount));
}

#[test]
fn emission_order_equals_source_order() {
    let (model, sales, _) = sample_model();

    let text = "[Amount] + COUNTROWS(Dates) + [Cost]";
    let edges = resolve(&model, Some(sales), text);
    assert_eq!(edges.len(), 3);
    assert!(edges.windows(2).all(|w| w[0].start < w[1].start));
    let kinds: Vec<bool> = edges.iter().map(|e| e.is_table_ref).collect();
    assert_eq!(kinds, vec![false, true, false]);
}
