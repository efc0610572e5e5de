//! Level meter of the live mix
//!
//! The mix is a plain sum of every sounding note, so it can go past full
//! scale. The meter shows per-column peaks of the last samples pulled by the
//! output device and turns red once any of them is over.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
    Frame,
};

/// Bar height of a full-scale column.
const FULL_SCALE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub peak: f32,
    pub rms: f32,
    /// Samples beyond full scale.
    pub overs: usize,
}

impl Levels {
    pub fn measure(samples: &[f32]) -> Self {
        let mut peak = 0.0f32;
        let mut energy = 0.0f64;
        let mut overs = 0;
        for &sample in samples {
            let level = sample.abs();
            peak = peak.max(level);
            energy += f64::from(sample) * f64::from(sample);
            if level > 1.0 {
                overs += 1;
            }
        }
        let rms = if samples.is_empty() {
            0.0
        } else {
            (energy / samples.len() as f64).sqrt() as f32
        };
        Self { peak, rms, overs }
    }

    fn rms_label(&self) -> String {
        if self.rms > 0.0 {
            format!("{:.1} dB", 20.0 * self.rms.log10())
        } else {
            String::from("-inf dB")
        }
    }
}

/// Split `samples` into `width` columns and scale each column's peak to
/// `0..=FULL_SCALE`. Overs are pinned to the top.
fn columns(samples: &[f32], width: usize) -> Vec<u64> {
    if width == 0 || samples.is_empty() {
        return vec![0; width];
    }
    (0..width)
        .map(|col| {
            let start = col * samples.len() / width;
            let end = ((col + 1) * samples.len() / width).max(start + 1);
            let peak = samples[start..end.min(samples.len())]
                .iter()
                .fold(0.0f32, |acc, s| acc.max(s.abs()));
            (peak.min(1.0) * FULL_SCALE as f32).round() as u64
        })
        .collect()
}

pub fn render_meter(frame: &mut Frame, area: Rect, samples: &[f32]) {
    let levels = Levels::measure(samples);
    let color = if levels.overs > 0 { Color::Red } else { Color::Cyan };
    let block = Block::default()
        .title(format!(
            " Mix  peak {:.2}  rms {}  overs {} ",
            levels.peak,
            levels.rms_label(),
            levels.overs
        ))
        .borders(Borders::ALL);

    let data = columns(samples, area.width.saturating_sub(2) as usize);
    let sparkline = Sparkline::default()
        .block(block)
        .data(&data)
        .max(FULL_SCALE)
        .style(Style::default().fg(color));
    frame.render_widget(sparkline, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_measures_zero() {
        let levels = Levels::measure(&[0.0; 64]);
        assert_eq!(levels, Levels { peak: 0.0, rms: 0.0, overs: 0 });
        assert_eq!(levels.rms_label(), "-inf dB");
        assert_eq!(Levels::measure(&[]).rms, 0.0);
    }

    #[test]
    fn overs_are_counted() {
        let levels = Levels::measure(&[0.5, -1.5, 1.0, 2.0]);
        assert_eq!(levels.peak, 2.0);
        assert_eq!(levels.overs, 2, "exactly full scale is not an over");
    }

    #[test]
    fn full_scale_square_is_zero_db() {
        let levels = Levels::measure(&[1.0, -1.0, 1.0, -1.0]);
        assert_eq!(levels.rms_label(), "0.0 dB");
    }

    #[test]
    fn columns_hold_the_peak_of_their_slice() {
        let samples = [0.1, -0.5, 0.2, 0.25, 3.0, 0.0];
        assert_eq!(columns(&samples, 3), vec![50, 25, 100]);
    }

    #[test]
    fn columns_cover_narrow_buffers() {
        assert_eq!(columns(&[0.5], 4), vec![50, 50, 50, 50]);
        assert_eq!(columns(&[], 2), vec![0, 0]);
        assert!(columns(&[0.5], 0).is_empty());
    }
}
