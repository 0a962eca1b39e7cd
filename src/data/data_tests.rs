pub(crate) use super::*;

fn sample_df() -> DataFrame {
    DataFrame::new(vec![
        ("a".to_string(), Vector::from_slice(&[1.0, 2.0, 3.0, 4.0])),
        ("b".to_string(), Vector::from_slice(&[10.0, 20.0, 30.0, 40.0])),
    ])
    .expect("valid columns")
}

#[test]
fn test_new_rejects_ragged_columns() {
    let result = DataFrame::new(vec![
        ("a".to_string(), Vector::from_slice(&[1.0, 2.0])),
        ("b".to_string(), Vector::from_slice(&[1.0])),
    ]);
    let err = result.expect_err("ragged columns");
    assert!(err.to_string().contains("'b'"));
}

#[test]
fn test_new_rejects_duplicates() {
    let result = DataFrame::new(vec![
        ("a".to_string(), Vector::from_slice(&[1.0])),
        ("a".to_string(), Vector::from_slice(&[2.0])),
    ]);
    assert!(result.is_err());
}

#[test]
fn test_new_rejects_empty() {
    assert!(DataFrame::new(vec![]).is_err());
}

#[test]
fn test_column_lookup() {
    let df = sample_df();
    assert_eq!(df.column("b").expect("exists").as_slice(), &[10.0, 20.0, 30.0, 40.0]);
    let err = df.column("zzz").expect_err("absent");
    assert!(err.is_schema());
}

#[test]
fn test_select_reorders() {
    let df = sample_df().select(&["b", "a"]).expect("both exist");
    assert_eq!(df.column_names(), vec!["b", "a"]);
    assert_eq!(df.to_matrix().row_slice(0), &[10.0, 1.0]);
}

#[test]
fn test_row_and_mapping() {
    let df = sample_df();
    assert_eq!(df.row(2).expect("in bounds").as_slice(), &[3.0, 30.0]);
    let map = df.row_mapping(1).expect("in bounds");
    assert_eq!(map["a"], 2.0);
    assert_eq!(map["b"], 20.0);
    assert!(df.row(4).is_err());
}

#[test]
fn test_add_column() {
    let mut df = sample_df();
    df.add_column("c".to_string(), Vector::from_slice(&[0.0; 4]))
        .expect("valid column");
    assert_eq!(df.shape(), (4, 3));
    assert!(df
        .add_column("c".to_string(), Vector::from_slice(&[0.0; 4]))
        .is_err());
    assert!(df
        .add_column("d".to_string(), Vector::from_slice(&[0.0; 3]))
        .is_err());
}

#[test]
fn test_take_rows() {
    let df = sample_df().take_rows(&[3, 0]);
    assert_eq!(df.n_rows(), 2);
    assert_eq!(df.column("a").expect("exists").as_slice(), &[4.0, 1.0]);
}

#[test]
fn test_from_records_uses_canonical_order() {
    let records = vec![
        AreaRecord::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]),
        AreaRecord::from_array([8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0]),
    ];
    let df = DataFrame::from_records(&records).expect("non-empty");
    assert_eq!(df.column_names(), Feature::names().to_vec());
    assert_eq!(df.to_matrix().row_slice(1), &records[1].to_array());
    assert!(DataFrame::from_records(&[]).is_err());
}

#[test]
fn test_describe() {
    let stats = sample_df().describe();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].name, "a");
    assert_eq!(stats[0].count, 4);
    assert!((stats[0].mean - 2.5).abs() < 1e-12);
    assert!((stats[0].median - 2.5).abs() < 1e-12);
    assert_eq!(stats[1].min, 10.0);
    assert_eq!(stats[1].max, 40.0);
}
