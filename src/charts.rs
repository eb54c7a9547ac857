use std::collections::HashMap;
use std::path::PathBuf;

use itertools::Itertools;
use plotly::common::{ColorScale, ColorScalePalette, Marker, Orientation, Title};
use plotly::layout::{Axis, Layout};
use plotly::{Bar, Plot};
use tracing::info;

use crate::clean::StreamingRecord;
use crate::error::Result;

pub const TOP_N: usize = 10;
pub const YEAR_BINS: usize = 20;

/// Where rendered charts go. Chart construction is the same for both.
#[derive(Debug, Clone)]
pub enum ChartSink {
    /// Open each chart in the default browser.
    Display,
    /// Write `<name>.html` files into this directory.
    HtmlDir(PathBuf),
}

impl ChartSink {
    fn emit(&self, plot: &Plot, name: &str) -> Result<()> {
        match self {
            ChartSink::Display => plot.show(),
            ChartSink::HtmlDir(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(format!("{}.html", name));
                plot.write_html(&path);
                info!("Wrote {:?}", path);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearBin {
    pub start: f64,
    pub end: f64,
    pub streams: f64,
}

impl YearBin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// The `n` most-streamed records, highest first. Ties keep input order.
pub fn top_songs(records: &[StreamingRecord], n: usize) -> Vec<&StreamingRecord> {
    records
        .iter()
        .sorted_by(|a, b| b.streams_billions.total_cmp(&a.streams_billions))
        .take(n)
        .collect()
}

/// Histogram of release years weighted by streams: `bins` equal-width bins
/// from the earliest to the latest year, the last bin closed on the right.
pub fn audience_by_year(records: &[StreamingRecord], bins: usize) -> Vec<YearBin> {
    let Some((min, max)) = records.iter().map(|r| r.release_year).minmax().into_option() else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    let (lo, hi) = if min == max {
        (min as f64 - 0.5, max as f64 + 0.5)
    } else {
        (min as f64, max as f64)
    };
    let width = (hi - lo) / bins as f64;

    let mut out: Vec<YearBin> = (0..bins)
        .map(|i| YearBin {
            start: lo + width * i as f64,
            end: lo + width * (i + 1) as f64,
            streams: 0.0,
        })
        .collect();
    for r in records {
        let idx = (((r.release_year as f64 - lo) / width) as usize).min(bins - 1);
        out[idx].streams += r.streams_billions;
    }
    out
}

/// Songs per distinct `Artist(s)` value, most first; ties in first-seen order.
pub fn top_artists(records: &[StreamingRecord], n: usize) -> Vec<(String, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in records {
        let c = counts.entry(r.artists.as_str()).or_insert_with(|| {
            order.push(r.artists.as_str());
            0
        });
        *c += 1;
    }
    order
        .into_iter()
        .map(|a| (a.to_string(), counts[a]))
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(n)
        .collect()
}

fn layout(title: &str, x: &str, y: &str) -> Layout {
    Layout::new()
        .title(Title::with_text(title))
        .x_axis(Axis::new().title(Title::with_text(x)))
        .y_axis(Axis::new().title(Title::with_text(y)))
        .width(1200)
        .height(600)
}

fn viridis(values: Vec<f64>) -> Marker {
    Marker::new()
        .color_array(values)
        .color_scale(ColorScale::Palette(ColorScalePalette::Viridis))
}

pub fn top_songs_chart(records: &[StreamingRecord]) -> Plot {
    // plotly draws the first category at the bottom
    let top: Vec<_> = top_songs(records, TOP_N).into_iter().rev().collect();
    let streams: Vec<f64> = top.iter().map(|r| r.streams_billions).collect();
    let songs: Vec<String> = top.iter().map(|r| r.song.clone()).collect();

    let mut plot = Plot::new();
    plot.add_trace(
        Bar::new(streams.clone(), songs)
            .orientation(Orientation::Horizontal)
            .marker(viridis(streams)),
    );
    plot.set_layout(layout(
        "Top 10 most-streamed songs on Spotify",
        "Streams (billions)",
        "Song",
    ));
    plot
}

pub fn audience_chart(records: &[StreamingRecord]) -> Plot {
    let bins = audience_by_year(records, YEAR_BINS);
    let width = bins.first().map(|b| b.end - b.start).unwrap_or(1.0);
    let centers: Vec<f64> = bins.iter().map(YearBin::center).collect();
    let streams: Vec<f64> = bins.iter().map(|b| b.streams).collect();

    let mut plot = Plot::new();
    plot.add_trace(
        Bar::new(centers.clone(), streams)
            .width(width)
            .marker(viridis(centers)),
    );
    plot.set_layout(layout(
        "Audience by release year",
        "Release year",
        "Accumulated audience (billions of streams)",
    ));
    plot
}

pub fn top_artists_chart(records: &[StreamingRecord]) -> Plot {
    let top: Vec<_> = top_artists(records, TOP_N).into_iter().rev().collect();
    let counts: Vec<usize> = top.iter().map(|(_, n)| *n).collect();
    let artists: Vec<String> = top.into_iter().map(|(a, _)| a).collect();
    let shades: Vec<f64> = (0..counts.len()).map(|i| i as f64).collect();

    let mut plot = Plot::new();
    plot.add_trace(
        Bar::new(counts, artists)
            .orientation(Orientation::Horizontal)
            .marker(viridis(shades)),
    );
    plot.set_layout(layout(
        "Top 10 artists by songs in the ranking",
        "Songs in the ranking",
        "Artist",
    ));
    plot
}

/// Build the three charts from the cleaned records and hand them to `sink`.
pub fn render_all(records: &[StreamingRecord], sink: &ChartSink) -> Result<()> {
    sink.emit(&top_songs_chart(records), "top_songs")?;
    sink.emit(&audience_chart(records), "audience_by_year")?;
    sink.emit(&top_artists_chart(records), "top_artists")?;
    info!("Rendered 3 charts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(song: &str, artists: &str, streams: f64, year: i32) -> StreamingRecord {
        StreamingRecord {
            rank: 0,
            song: song.to_string(),
            artists: artists.to_string(),
            streams_billions: streams,
            release_date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            release_year: year,
        }
    }

    fn sample() -> Vec<StreamingRecord> {
        (0..15)
            .map(|i| {
                let artist = match i % 4 {
                    0 => "Ed Sheeran",
                    1 => "The Weeknd",
                    2 => "Drake",
                    _ => "Post Malone",
                };
                record(&format!("song {}", i), artist, 2.0 + i as f64 / 10.0, 2000 + i)
            })
            .collect()
    }

    #[test]
    fn top_songs_highest_first() {
        let recs = sample();
        let top = top_songs(&recs, TOP_N);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].song, "song 14");
        assert!(top
            .windows(2)
            .all(|w| w[0].streams_billions >= w[1].streams_billions));
    }

    #[test]
    fn histogram_keeps_total_streams() {
        let recs = sample();
        let bins = audience_by_year(&recs, YEAR_BINS);
        assert_eq!(bins.len(), YEAR_BINS);
        assert_eq!(bins[0].start, 2000.0);
        assert!((bins[YEAR_BINS - 1].end - 2014.0).abs() < 1e-9);
        let total: f64 = recs.iter().map(|r| r.streams_billions).sum();
        let binned: f64 = bins.iter().map(|b| b.streams).sum();
        assert!((total - binned).abs() < 1e-9);
        // the latest year lands in the closed last bin
        assert!((bins[YEAR_BINS - 1].streams - 3.4).abs() < 1e-9);
    }

    #[test]
    fn histogram_single_year() {
        let recs = vec![record("a", "x", 1.5, 2017), record("b", "y", 2.0, 2017)];
        let bins = audience_by_year(&recs, YEAR_BINS);
        assert_eq!(bins[0].start, 2016.5);
        assert!((bins[YEAR_BINS - 1].end - 2017.5).abs() < 1e-9);
        let binned: f64 = bins.iter().map(|b| b.streams).sum();
        assert!((binned - 3.5).abs() < 1e-9);
    }

    #[test]
    fn histogram_empty() {
        assert!(audience_by_year(&[], YEAR_BINS).is_empty());
    }

    #[test]
    fn artist_counts_ties_in_first_seen_order() {
        let recs = sample();
        let top = top_artists(&recs, TOP_N);
        assert_eq!(
            top,
            vec![
                ("Ed Sheeran".to_string(), 4),
                ("The Weeknd".to_string(), 4),
                ("Drake".to_string(), 4),
                ("Post Malone".to_string(), 3),
            ]
        );
        assert_eq!(top_artists(&recs, 2).len(), 2);
    }

    #[test]
    fn html_sink_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ChartSink::HtmlDir(dir.path().join("charts"));
        render_all(&sample(), &sink).unwrap();
        for name in ["top_songs", "audience_by_year", "top_artists"] {
            let path = dir.path().join("charts").join(format!("{}.html", name));
            assert!(path.exists(), "{:?}", path);
        }
    }
}
