use chrono::NaiveDate;
use climgrid::{geo::Coord, Band, Crs, Grid};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use suitability::{
    scenario::{NEX_DCP30, PRISM, SOILGRIDS_PH},
    CropParams, Image, MemSource, SuitabilityModel, MONTHS,
};

const ROWS: usize = 256;
const COLS: usize = 256;

fn grid() -> Grid {
    Grid::new(
        Coord { x: -77.0, y: 41.0 },
        (2.0 / 256.0, 2.0 / 256.0),
        (ROWS, COLS),
        Crs::Wgs84,
    )
}

/// A field varying smoothly around `base` so masks are not uniform.
#[allow(clippy::cast_precision_loss)]
fn field(name: &str, base: f32, spread: f32) -> Arc<Band> {
    let samples = (0..ROWS * COLS)
        .map(|idx| {
            let (row, col) = (idx / COLS, idx % COLS);
            base + spread * ((row as f32 / ROWS as f32) - (col as f32 / COLS as f32))
        })
        .collect();
    Arc::new(Band::new(name, grid(), samples).unwrap())
}

fn synthetic_source() -> MemSource {
    let mut src = MemSource::new().with(
        SOILGRIDS_PH,
        Image::new("phh2o").with_band(field("phh2o_0-5cm_mean", 62.0, 10.0)),
    );
    for month in MONTHS {
        src.insert(
            PRISM,
            Image::new(format!("{:02}", month.number_from_month()))
                .with_month(month)
                .with_band(field("ppt", 95.0, 40.0))
                .with_band(field("tmin", 8.0, 10.0))
                .with_band(field("tmean", 20.0, 8.0)),
        );
        for year in [2020, 2040, 2060] {
            let date = NaiveDate::from_ymd_opt(year, month.number_from_month(), 1).unwrap();
            src.insert(
                NEX_DCP30,
                Image::new(format!("rcp85_{date}"))
                    .with_date(date)
                    .with_property("scenario", "rcp85")
                    .with_band(field("tasmin_mean", 282.0, 10.0))
                    .with_band(field("tasmax_mean", 304.0, 10.0))
                    .with_band(field("pr_mean", 3.8e-5, 1.5e-5)),
            );
        }
    }
    src
}

fn scenarios(c: &mut Criterion) {
    let mut group = c.benchmark_group("Suitability");
    let src = synthetic_source();
    let model = SuitabilityModel::builder()
        .crop(CropParams::sweet_corn())
        .build(&src)
        .unwrap();

    group.bench_function("current", |b| {
        let current = model.scenario("current").unwrap();
        b.iter(|| model.evaluate(current).unwrap())
    });
    group.bench_function("all", |b| b.iter(|| model.evaluate_all().unwrap()));
}

criterion_group!(benches, scenarios);
criterion_main!(benches);
