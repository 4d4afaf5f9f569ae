// ==========================================
// 改价回填 端到端测试
// ==========================================
// 测试目标: 导出毛利表 → 人工改价 → 回填原始数据 → 导出
// ==========================================


use calamine::{open_workbook_auto, Data, Reader};
use profit_table::domain::{MatchMethod, NewProfitRate, PivotFormat};
use tempfile::TempDir;
use test_helpers::{quiet_service, write_csv, SOURCE_HEADER};

#[test]
fn test_exported_table_reconciles_unchanged() {
    let source = write_csv(
        "货品ID,简称,分类,价格,成本,颜色",
        &[
            "1,山地车经典26寸7速,山地车,220,130,",
            "2,山地车经典26寸21速,山地车,260,150,",
            "3,山地车运动26寸21速,山地车,300,180,",
            "4,儿童车小黄鸭,儿童车,99,50,",
            "5,山地车26寸,山地车,180,100,红",
        ],
    );
    let dir = TempDir::new().unwrap();
    let table_path = dir.path().join("毛利表.xlsx");

    let mut service = quiet_service();
    assert!(service.import_data(source.path()).success);
    assert!(service.process_and_generate().success);
    assert!(service.export_profit_table(&table_path).success);

    // 未改价直接回填: 每行都能找回自己的价格
    let result = service.import_edited_table_and_reconcile(&table_path);
    assert!(result.success, "{}", result.message);

    let report = result.data.unwrap();
    assert_eq!(report.matched_count, 5);
    assert_eq!(report.unmatched_count, 0);
    let prices: Vec<Option<f64>> = report.records.iter().map(|r| r.post_edit_price).collect();
    assert_eq!(
        prices,
        vec![Some(220.0), Some(260.0), Some(300.0), Some(99.0), Some(180.0)]
    );
}

#[test]
fn test_edited_prices_flow_back_with_surcharge() {
    let source = write_csv(
        SOURCE_HEADER,
        &[
            "1,山地车经典26寸7速,山地车,220,130",
            "2,山地车经典27.5寸7速,山地车,240,140",
            "3,山地车经典24寸7速,山地车,200,120",
            "4,公路车旗舰21速,公路车,500,300",
        ],
    );
    let edited = write_csv("简称,速别,价格", &["山地车经典26寸7速,7速,100"]);

    let mut service = quiet_service();
    assert!(service.import_data(source.path()).success);
    let result = service.import_edited_table_and_reconcile(edited.path());
    assert!(result.success, "{}", result.message);

    let report = result.data.unwrap();
    assert_eq!(report.matched_count, 3);
    assert_eq!(report.unmatched_count, 1);
    assert_eq!(report.unmatched_rows(), vec![3]);

    let records = &report.records;
    assert_eq!(records[0].post_edit_price, Some(100.0));
    assert_eq!(records[0].match_method, Some(MatchMethod::Exact));
    assert_eq!(records[0].new_profit_rate, NewProfitRate::Rate(-60.0));

    // 27.5寸 加价 20
    assert_eq!(records[1].post_edit_price, Some(120.0));
    assert_eq!(records[1].match_method, Some(MatchMethod::SizeNormalized));

    assert_eq!(records[2].post_edit_price, Some(100.0));
    assert_eq!(records[2].match_method, Some(MatchMethod::SizeNormalized));

    assert!(records[3].unmatched);
    assert_eq!(records[3].post_edit_price, None);
}

#[test]
fn test_size_based_table_matches_without_speed_column() {
    let source = write_csv(
        SOURCE_HEADER,
        &["1,公路车竞速24寸,公路车,300,200", "2,公路车竞速26寸,公路车,320,210"],
    );
    // 尺寸格式毛利表没有 速别 列
    let edited = write_csv("配置,尺寸,价格,简称", &["竞速单速,26寸,330,公路车竞速26寸"]);

    let mut service = quiet_service();
    assert!(service.import_data(source.path()).success);
    let report = service
        .import_edited_table_and_reconcile(edited.path())
        .data
        .unwrap();

    assert_eq!(report.matched_count, 2);
    assert_eq!(
        report.records[0].match_method,
        Some(MatchMethod::SizeNormalizedBare)
    );
    assert_eq!(report.records[1].match_method, Some(MatchMethod::ExactBare));
    assert!(report.records.iter().all(|r| r.post_edit_price == Some(330.0)));
}

#[test]
fn test_exported_size_based_table_reconciles_unchanged() {
    let source = write_csv(
        SOURCE_HEADER,
        &[
            "1,山地车甲24寸,山地车,200,120",
            "2,山地车乙27.5寸,山地车,260,150",
            "3,山地车丙26寸,山地车,220,130",
        ],
    );
    let dir = TempDir::new().unwrap();
    let table_path = dir.path().join("毛利表.xlsx");

    let mut service = quiet_service();
    assert!(service.import_data(source.path()).success);
    let table = service.process_and_generate().data.unwrap();
    assert_eq!(table.format, PivotFormat::SizeBased);
    assert!(service.export_profit_table(&table_path).success);

    // 导出的尺寸格式毛利表没有 速别 列，每行按简称找回自身价格
    let report = service
        .import_edited_table_and_reconcile(&table_path)
        .data
        .unwrap();
    assert_eq!(report.unmatched_count, 0);

    let matched: Vec<(&str, Option<f64>, Option<MatchMethod>)> = report
        .records
        .iter()
        .map(|r| (r.record.short_name.as_str(), r.post_edit_price, r.match_method))
        .collect();
    assert_eq!(
        matched,
        vec![
            ("山地车甲24寸", Some(200.0), Some(MatchMethod::ExactBare)),
            // 27.5寸 命中后仍加价 20
            ("山地车乙27.5寸", Some(280.0), Some(MatchMethod::ExactBare)),
            ("山地车丙26寸", Some(220.0), Some(MatchMethod::ExactBare)),
        ]
    );
}

#[test]
fn test_duplicate_keys_last_row_wins() {
    let source = write_csv(SOURCE_HEADER, &["1,山地车经典26寸7速,山地车,220,130"]);
    let edited = write_csv(
        "简称,速别,价格",
        &["山地车经典26寸7速,7速,100", "山地车经典26寸7速,7速,110"],
    );

    let mut service = quiet_service();
    assert!(service.import_data(source.path()).success);
    let report = service
        .import_edited_table_and_reconcile(edited.path())
        .data
        .unwrap();

    assert_eq!(report.records[0].post_edit_price, Some(110.0));
    assert_eq!(report.duplicate_keys, vec!["山地车经典26寸7速|7速".to_string()]);
}

#[test]
fn test_export_updated_data() {
    let source = write_csv(
        SOURCE_HEADER,
        &[
            "1002003004005006007,山地车经典26寸7速,山地车,220,130",
            "1002003004005006008,公路车旗舰21速,公路车,500,300",
        ],
    );
    let edited = write_csv("简称,速别,价格", &["山地车经典26寸7速,7速,250"]);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("改价后原始数据.xlsx");

    let mut service = quiet_service();
    assert!(service.import_data(source.path()).success);
    assert!(service.import_edited_table_and_reconcile(edited.path()).success);
    let exported = service.export_updated_data(&output);
    assert!(exported.success, "{}", exported.message);

    let mut workbook = open_workbook_auto(&output).unwrap();
    let range = workbook.worksheet_range("修改后原始数据").unwrap();
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();

    assert_eq!(rows[0][5], Data::String("修改后价格".to_string()));
    assert_eq!(rows[0][6], Data::String("新毛利率".to_string()));
    assert_eq!(rows[1][0], Data::String("1002003004005006007".to_string()));
    assert_eq!(rows[1][5], Data::Float(250.0));
    assert_eq!(rows[1][6], Data::String("36.00%".to_string()));
    assert_eq!(rows[2][5], Data::Empty);

    let summary = service.summary();
    assert_eq!(summary.updated_count, 2);
    assert_eq!(summary.unmatched_count, 1);
}
