use page_export::*;

#[test]
fn test_defaults_are_valid() {
    let options = ExportOptions::default();
    assert!(options.validate().is_ok());
    assert_eq!(options.blank.sample_grid_cols, 5);
    assert_eq!(options.blank.sample_grid_rows, 4);
    assert_eq!(options.blank.white_threshold, 250);
    assert_eq!(options.oversample, 2.0);
    assert!(options.capture_timeout.is_none());
}

#[test]
fn test_validation_rejects_bad_dpi() {
    let mut options = ExportOptions::default();
    options.dpi = 0.0;
    match options.validate() {
        Err(ExportError::Config(msg)) => assert!(msg.contains("DPI")),
        other => panic!("expected Config error, got {:?}", other),
    }

    options.dpi = f32::NAN;
    assert!(options.validate().is_err());
}

#[test]
fn test_validation_rejects_zero_sample_grid() {
    let mut options = ExportOptions::default();
    options.blank.sample_grid_cols = 0;
    assert!(options.validate().is_err());

    options.blank.sample_grid_cols = 5;
    options.blank.sample_grid_rows = 0;
    assert!(options.validate().is_err());
}

#[test]
fn test_validation_rejects_margins_consuming_page() {
    let mut options = ExportOptions::default();
    options.margins = PageMargins::uniform(150.0);
    match options.validate() {
        Err(ExportError::Config(msg)) => assert!(msg.contains("content area")),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn test_content_dimensions() {
    let options = ExportOptions::default();
    let (cw, ch) = options.content_dimensions_mm();
    // A4 portrait minus uniform 10mm margins
    assert!((cw - 190.0).abs() < 1e-4);
    assert!((ch - 277.0).abs() < 1e-4);
}

#[test]
fn test_landscape_swaps_dimensions() {
    let options = ExportOptions {
        orientation: Orientation::Landscape,
        ..ExportOptions::default()
    };
    let (w, h) = options.page_dimensions_mm();
    assert_eq!((w, h), (297.0, 210.0));
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_save_and_load_options() {
    use tempfile::NamedTempFile;

    let options = ExportOptions {
        paper_size: PaperSize::Letter,
        orientation: Orientation::Landscape,
        margins: PageMargins::uniform(15.0),
        dpi: 150.0,
        capture_timeout: Some(std::time::Duration::from_secs(30)),
        blank: BlankDetection {
            sample_grid_cols: 7,
            sample_grid_rows: 5,
            white_threshold: 245,
        },
        ..ExportOptions::default()
    };

    let temp = NamedTempFile::new().unwrap();
    options.save(temp.path()).await.unwrap();
    let loaded = ExportOptions::load(temp.path()).await.unwrap();
    assert_eq!(loaded, options);
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_load_rejects_malformed_config() {
    use tempfile::NamedTempFile;

    let temp = NamedTempFile::new().unwrap();
    tokio::fs::write(temp.path(), b"{ not json").await.unwrap();
    let result = ExportOptions::load(temp.path()).await;
    assert!(matches!(result, Err(ExportError::Config(_))));
}
