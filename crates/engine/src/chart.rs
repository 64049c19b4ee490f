use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use plotters::prelude::*;

use common::{Candle, ChartImage, ChartRenderer, Error, Result, Symbol, Timeframe};

const GAIN: RGBColor = RGBColor(38, 166, 91);
const LOSS: RGBColor = RGBColor(214, 48, 49);

/// Candlestick chart with a volume strip underneath, encoded as PNG.
///
/// No text is drawn: the classifier is told the timeframe of each image by
/// its position in the request.
#[derive(Debug, Clone)]
pub struct CandleChartRenderer {
    width: u32,
    height: u32,
}

impl Default for CandleChartRenderer {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 640,
        }
    }
}

impl CandleChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width >= 64 && height >= 64, "chart must be at least 64x64");
        Self { width, height }
    }

    fn draw(&self, candles: &[Candle], buf: &mut [u8]) -> Result<()> {
        let (w, h) = (self.width, self.height);
        let root = BitMapBackend::with_buffer(buf, (w, h)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let (price_area, volume_area) = root.split_vertically(h * 3 / 4);

        let n = candles.len() as f64;
        let (low, high) = price_bounds(candles);
        let max_volume = candles
            .iter()
            .map(|c| c.volume)
            .fold(0.0_f64, f64::max)
            .max(f64::EPSILON);
        // Body width in pixels, leaving a gap between neighbours.
        let body_px = ((w as f64 / n.max(1.0)) * 0.7).clamp(1.0, 24.0) as u32;

        let mut price_chart = ChartBuilder::on(&price_area)
            .margin(8)
            .build_cartesian_2d(-1.0..n, low..high)
            .map_err(render_err)?;
        price_chart
            .draw_series(candles.iter().enumerate().map(|(i, c)| {
                CandleStick::new(
                    i as f64,
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    GAIN.filled(),
                    LOSS.filled(),
                    body_px,
                )
            }))
            .map_err(render_err)?;

        let mut volume_chart = ChartBuilder::on(&volume_area)
            .margin(8)
            .build_cartesian_2d(-1.0..n, 0.0..max_volume)
            .map_err(render_err)?;
        volume_chart
            .draw_series(candles.iter().enumerate().map(|(i, c)| {
                let color = if c.close >= c.open { GAIN } else { LOSS };
                let x = i as f64;
                Rectangle::new([(x - 0.35, 0.0), (x + 0.35, c.volume)], color.mix(0.6).filled())
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    }
}

impl ChartRenderer for CandleChartRenderer {
    fn render(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Result<ChartImage> {
        if candles.is_empty() {
            return Err(Error::Render(format!("no candles to chart for {symbol} {timeframe}")));
        }

        let mut buf = vec![0u8; (self.width * self.height * 3) as usize];
        self.draw(candles, &mut buf)?;

        let img = RgbImage::from_raw(self.width, self.height, buf)
            .ok_or_else(|| Error::Render("pixel buffer does not match chart size".into()))?;
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::Render(format!("PNG encode failed: {e}")))?;

        Ok(ChartImage {
            timeframe,
            mime_type: "image/png",
            bytes: png,
        })
    }
}

/// Low/high of the series with a small margin so wicks do not touch the frame.
fn price_bounds(candles: &[Candle]) -> (f64, f64) {
    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((high - low) * 0.05).max(high.abs() * 1e-6).max(f64::EPSILON);
    (low - pad, high + pad)
}

fn render_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Render(e.to_string())
}
