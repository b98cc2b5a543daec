//! Decoding GeoTIFF bytes into datasets, materialized and lazy.

use raster_grid::{
    cell_center, decode, query, resolve, CellLocation, PixelQueryResult, RasterConfig, RasterError,
    ValueStats,
};
use test_utils::{assert_coords_approx_eq, create_test_grid, with_cells, GeoTiffBuilder};

fn lazy_config() -> RasterConfig {
    RasterConfig::always_lazy()
}

// ============================================================================
// Georeferencing and metadata
// ============================================================================

#[test]
fn test_decode_stripped_with_metadata() {
    let values = with_cells(create_test_grid(4, 3), 4, &[(2, 1)], -9999.0);
    let bytes = GeoTiffBuilder::new(4, 3, values)
        .origin(-125.0, 50.0)
        .cell_size(0.5, 0.25)
        .no_data(-9999.0)
        .statistics(0.0, 3002.0)
        .build_bytes();

    let ds = decode(bytes, &RasterConfig::default()).unwrap();
    assert_eq!((ds.width(), ds.height()), (4, 3));
    assert_eq!((ds.origin_x(), ds.origin_y()), (-125.0, 50.0));
    assert_eq!((ds.cell_width(), ds.cell_height()), (0.5, 0.25));
    assert_eq!(ds.stats(), Some(ValueStats::new(0.0, 3002.0)));
    assert_eq!(ds.no_data(), Some(-9999.0));
    assert!(!ds.is_lazy());

    // col * 1000 + row
    assert_eq!(ds.value_at(0, 0).unwrap(), 0.0);
    assert_eq!(ds.value_at(1, 3).unwrap(), 3001.0);
    assert!(ds.value_at(2, 1).unwrap().is_nan());

    let bounds = ds.bounds();
    assert_eq!((bounds.min_x, bounds.max_x), (-125.0, -123.0));
    assert_eq!((bounds.min_y, bounds.max_y), (49.25, 50.0));
}

#[test]
fn test_decode_without_statistics() {
    let bytes = GeoTiffBuilder::new(2, 2, vec![1.0, 2.0, 3.0, 4.0])
        .origin(0.0, 10.0)
        .build_bytes();
    let ds = decode(bytes, &RasterConfig::default()).unwrap();
    assert_eq!(ds.stats(), None);
    assert_eq!(ds.no_data(), None);
}

#[test]
fn test_decode_model_transformation() {
    let bytes = GeoTiffBuilder::new(2, 2, vec![1.0, 2.0, 3.0, 4.0])
        .origin(-10.0, 10.0)
        .cell_size(5.0, 5.0)
        .model_transformation()
        .build_bytes();
    let ds = decode(bytes, &RasterConfig::default()).unwrap();
    assert_eq!((ds.origin_x(), ds.origin_y()), (-10.0, 10.0));
    assert_eq!((ds.cell_width(), ds.cell_height()), (5.0, 5.0));
    assert_eq!(resolve(&ds, 8.0, -1.0), CellLocation::Cell { row: 0, col: 1 });
}

#[test]
fn test_cell_centers_resolve_back_to_their_cell() {
    let bytes = GeoTiffBuilder::new(3, 2, create_test_grid(3, 2))
        .origin(-125.0, 50.0)
        .cell_size(0.5, 0.25)
        .build_bytes();
    let ds = decode(bytes, &RasterConfig::default()).unwrap();

    let (lat, lng) = cell_center(&ds, 1, 2).unwrap();
    assert_coords_approx_eq!((lat, lng), (49.625, -123.75), 1e-9);
    for row in 0..2 {
        for col in 0..3 {
            let (lat, lng) = cell_center(&ds, row, col).unwrap();
            assert_eq!(resolve(&ds, lat, lng), CellLocation::Cell { row, col });
        }
    }
    assert_eq!(cell_center(&ds, 2, 0), None);
}

#[test]
fn test_decode_missing_georeferencing() {
    let bytes = GeoTiffBuilder::new(2, 2, vec![0.0; 4])
        .without_georeferencing()
        .build_bytes();
    assert!(matches!(
        decode(bytes, &RasterConfig::default()),
        Err(RasterError::Decode(_))
    ));
}

#[test]
fn test_decode_non_positive_cell_size() {
    let bytes = GeoTiffBuilder::new(2, 2, vec![0.0; 4])
        .cell_size(0.0, 1.0)
        .build_bytes();
    assert!(decode(bytes, &RasterConfig::default()).is_err());
}

#[test]
fn test_decode_garbage() {
    let err = decode(bytes::Bytes::from_static(b"GIF89a...."), &RasterConfig::default());
    assert!(err.is_err());
    assert!(decode(bytes::Bytes::new(), &RasterConfig::default()).is_err());
}

// ============================================================================
// Lazy tiled access
// ============================================================================

#[test]
fn test_small_tiled_raster_is_materialized() {
    let bytes = GeoTiffBuilder::new(40, 20, create_test_grid(40, 20))
        .tiled(16, 16)
        .build_bytes();
    let ds = decode(bytes, &RasterConfig::default()).unwrap();
    assert!(!ds.is_lazy());
    assert_eq!(ds.value_at(19, 39).unwrap(), 39019.0);
}

#[test]
fn test_stripped_raster_is_never_lazy() {
    let bytes = GeoTiffBuilder::new(4, 4, create_test_grid(4, 4)).build_bytes();
    assert!(!decode(bytes, &lazy_config()).unwrap().is_lazy());
}

#[tokio::test]
async fn test_lazy_matches_materialized() {
    let values = with_cells(create_test_grid(40, 20), 40, &[(17, 33)], -1.0);
    let builder = GeoTiffBuilder::new(40, 20, values)
        .origin(-100.0, 40.0)
        .cell_size(0.1, 0.1)
        .no_data(-1.0)
        .tiled(16, 16);

    let lazy = decode(builder.build_bytes(), &lazy_config()).unwrap();
    let eager = decode(builder.build_bytes(), &RasterConfig::default()).unwrap();
    assert!(lazy.is_lazy());
    assert!(!eager.is_lazy());

    // A block spanning four tiles, including the partial right-hand column
    let a = lazy.fetch_region(10, 12, 28, 10).await.unwrap();
    let b = eager.fetch_region(10, 12, 28, 10).await.unwrap();
    assert_eq!(a.len(), 280);
    for (x, y) in a.values.iter().zip(b.values.iter()) {
        assert!(x == y || (x.is_nan() && y.is_nan()));
    }

    assert_eq!(lazy.value_at(19, 39).unwrap(), 39019.0);
    assert!(lazy.value_at(17, 33).unwrap().is_nan());
}

#[tokio::test]
async fn test_lazy_region_out_of_bounds() {
    let bytes = GeoTiffBuilder::new(40, 20, create_test_grid(40, 20))
        .tiled(16, 16)
        .build_bytes();
    let ds = decode(bytes, &lazy_config()).unwrap();

    assert!(matches!(
        ds.fetch_region(15, 0, 1, 6).await,
        Err(RasterError::RegionOutOfBounds { .. })
    ));
    assert!(ds.value_at(20, 0).is_err());
}

#[tokio::test]
async fn test_query_lazy_dataset() {
    let values = with_cells(create_test_grid(40, 20), 40, &[(0, 0)], -1.0);
    let bytes = GeoTiffBuilder::new(40, 20, values)
        .origin(0.0, 20.0)
        .no_data(-1.0)
        .tiled(16, 16)
        .build_bytes();
    let ds = decode(bytes, &lazy_config()).unwrap();

    assert_eq!(
        query(&ds, 2.5, 37.5).await.unwrap(),
        PixelQueryResult::Value {
            value: 37017.0,
            row: 17,
            col: 37
        }
    );
    assert_eq!(
        query(&ds, 19.5, 0.5).await.unwrap(),
        PixelQueryResult::NoData { row: 0, col: 0 }
    );
    assert_eq!(query(&ds, 25.0, 0.5).await.unwrap(), PixelQueryResult::OutsideGrid);
}

// ============================================================================
// Tile-build output: 256x256 DEFLATE tiles, float predictor, overviews
// ============================================================================

/// A raster laid out the way the tile build writes it, with two trailing
/// overview IFDs that carry no georeferencing.
fn tile_build_raster() -> GeoTiffBuilder {
    let values = with_cells(create_test_grid(300, 260), 300, &[(258, 290)], -9999.0);
    GeoTiffBuilder::new(300, 260, values)
        .origin(-180.0, 90.0)
        .cell_size(0.5, 0.5)
        .no_data(-9999.0)
        .statistics(0.0, 299259.0)
        .tiled(256, 256)
        .deflate()
        .float_predictor()
        .overviews(&[2, 4])
}

#[test]
fn test_decode_tile_build_output_materialized() {
    let ds = decode(tile_build_raster().build_bytes(), &RasterConfig::default()).unwrap();
    assert!(!ds.is_lazy());

    // Dimensions, georeferencing and tags come from the full-resolution IFD
    assert_eq!((ds.width(), ds.height()), (300, 260));
    assert_eq!((ds.origin_x(), ds.origin_y()), (-180.0, 90.0));
    assert_eq!((ds.cell_width(), ds.cell_height()), (0.5, 0.5));
    assert_eq!(ds.stats(), Some(ValueStats::new(0.0, 299259.0)));
    assert_eq!(ds.no_data(), Some(-9999.0));

    assert_eq!(ds.value_at(0, 0).unwrap(), 0.0);
    assert_eq!(ds.value_at(5, 7).unwrap(), 7005.0);
    assert_eq!(ds.value_at(255, 255).unwrap(), 255255.0);
    assert_eq!(ds.value_at(256, 256).unwrap(), 256256.0);
    assert_eq!(ds.value_at(259, 299).unwrap(), 299259.0);
    assert!(ds.value_at(258, 290).unwrap().is_nan());
}

#[tokio::test]
async fn test_decode_tile_build_output_lazy() {
    let builder = tile_build_raster();
    let lazy = decode(builder.build_bytes(), &lazy_config()).unwrap();
    let eager = decode(builder.build_bytes(), &RasterConfig::default()).unwrap();
    assert!(lazy.is_lazy());
    assert_eq!((lazy.width(), lazy.height()), (300, 260));
    assert_eq!((lazy.origin_x(), lazy.origin_y()), (-180.0, 90.0));

    assert_eq!(lazy.value_at(259, 299).unwrap(), 299259.0);
    assert!(lazy.value_at(258, 290).unwrap().is_nan());

    // Across all four tiles, including the partial right and bottom ones
    let a = lazy.fetch_region(250, 250, 50, 10).await.unwrap();
    let b = eager.fetch_region(250, 250, 50, 10).await.unwrap();
    assert_eq!(a.len(), 500);
    for (x, y) in a.values.iter().zip(b.values.iter()) {
        assert!(x == y || (x.is_nan() && y.is_nan()));
    }

    assert_eq!(
        query(&lazy, 90.0 - 0.5 * 200.5, -180.0 + 0.5 * 280.5).await.unwrap(),
        PixelQueryResult::Value {
            value: 280200.0,
            row: 200,
            col: 280
        }
    );
}

#[test]
fn test_decode_deflate_stripped_with_predictor() {
    let bytes = GeoTiffBuilder::new(5, 3, create_test_grid(5, 3))
        .origin(10.0, 20.0)
        .deflate()
        .float_predictor()
        .build_bytes();
    let ds = decode(bytes, &RasterConfig::default()).unwrap();
    assert_eq!(ds.value_at(2, 4).unwrap(), 4002.0);
    assert_eq!(ds.value_at(1, 0).unwrap(), 1.0);
}
