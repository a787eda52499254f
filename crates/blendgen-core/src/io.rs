//! Persistence for generated batches.
//!
//! Stacks go to a flat little-endian f32 file (one record = noiseless then
//! noisy stack, band-major), metadata and shift tables to CSV. A PNG
//! preview writer exists for eyeballing blends.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::Result;
use crate::pipeline::{SampleRecord, METADATA_KEYS};

/// Write all samples' image stacks as raw little-endian f32.
///
/// Layout per sample: the noiseless stack then the noisy stack, each
/// band-major `(bands, stamp, stamp)`, C order.
pub fn write_stacks(samples: &[SampleRecord], path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for sample in samples {
        for v in sample.noiseless.iter() {
            out.write_f32::<LittleEndian>(*v as f32)?;
        }
        for v in sample.noisy.iter() {
            out.write_f32::<LittleEndian>(*v as f32)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Write one CSV row per sample with the fixed metadata key set as header.
pub fn write_metadata_csv(samples: &[SampleRecord], path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", METADATA_KEYS.join(","))?;
    for sample in samples {
        let row: Vec<String> = sample
            .metadata
            .entries()
            .iter()
            .map(|(_, v)| format_value(*v))
            .collect();
        writeln!(out, "{}", row.join(","))?;
    }
    out.flush()?;
    Ok(())
}

/// Write shift tables as CSV: one row per sample, columns
/// `x0,y0,x1,y1,...` up to `max_sources`.
pub fn write_shifts_csv(samples: &[SampleRecord], path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    if let Some(first) = samples.first() {
        let rows = first.shifts.nrows();
        let header: Vec<String> = (0..rows)
            .flat_map(|i| [format!("x{i}"), format!("y{i}")])
            .collect();
        writeln!(out, "{}", header.join(","))?;
    }
    for sample in samples {
        let row: Vec<String> = sample.shifts.iter().map(|v| format_value(*v)).collect();
        writeln!(out, "{}", row.join(","))?;
    }
    out.flush()?;
    Ok(())
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{v}")
    }
}

/// Save a stamp as an 8-bit PNG, linearly stretched between its own
/// minimum and maximum.
pub fn save_stamp_png(stamp: &Array2<f64>, path: &Path) -> Result<()> {
    let (h, w) = stamp.dim();
    let min = stamp.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = stamp.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(f64::MIN_POSITIVE);

    let mut img = GrayImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let val = ((stamp[[row, col]] - min) / span * 255.0).clamp(0.0, 255.0) as u8;
            img.put_pixel(col as u32, row as u32, Luma([val]));
        }
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
