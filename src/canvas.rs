use std::io;
use std::io::{ BufWriter, Write };
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{ AtomicU32, Ordering };

use image::{ Rgb, RgbImage };

use crate::color::Color;
use crate::error::RenderError;

/// A canvas for drawing pixels.
///
/// The canvas is the finished (or in-progress) image: one color per pixel
/// on the 0-255 scale. Once rendering finishes, the `Canvas` can be saved to
/// an image file.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Canvas {
    /// The width of the canvas, in pixels.
    pub width: usize,

    /// The height of the canvas, in pixels.
    pub height: usize,

    /// The pixels of the canvas, stored as a flattened vector.
    pixels: Vec<Color>,
}

impl Canvas {
    /// Creates a new, black canvas with specified width and height.
    pub fn new(width: usize, height: usize) -> Canvas {
        Canvas {
            width,
            height,
            pixels: vec![Color::black(); width * height]
        }
    }

    /// Saves a canvas to an image file.
    ///
    /// The format follows the file extension: `.ppm` writes a plain-text
    /// PPM, anything else is handed to the `image` crate (PNG by default).
    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        let is_ppm = path.extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("ppm"));

        if is_ppm {
            let mut out = BufWriter::new(File::create(path)?);
            self.write_ppm(&mut out)?;
            out.flush()?;
        } else {
            self.to_image().save(path)?;
        }

        Ok(())
    }

    /// Writes the canvas as a plain-text (P3) PPM.
    ///
    /// Every image row starts on a new line, and lines are clamped to 70
    /// columns. A channel value which would cross the 70 column mark is
    /// moved to the next line over.
    pub fn write_ppm<W: Write>(&self, out: &mut W) -> io::Result<()> {
        // Write PPM header, as well as metadata
        writeln!(out, "P3")?;
        writeln!(out, "{} {}", self.width, self.height)?;
        writeln!(out, "255")?; // Maximum color value

        if self.width == 0 {
            return Ok(());
        }

        for row in self.pixels.chunks(self.width) {
            let mut line_len = 0;

            for pixel in row.iter() {
                for channel in pixel.to_rgb8().iter() {
                    let value = channel.to_string();

                    if line_len > 0 && line_len + 1 + value.len() > 70 {
                        writeln!(out)?;
                        line_len = 0;
                    }

                    if line_len > 0 {
                        write!(out, " ")?;
                        line_len += 1;
                    }

                    write!(out, "{}", value)?;
                    line_len += value.len();
                }
            }

            writeln!(out)?;
        }

        Ok(())
    }

    /// Converts the canvas to an 8-bit RGB image buffer.
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let pixel = self.pixels[(y as usize * self.width) + x as usize];
            Rgb(pixel.to_rgb8())
        })
    }

    /// Writes a color to a location on the `Canvas`.
    ///
    /// Out-of-bounds pixels are ignored. `x` is the column and `y` the row,
    /// both zero-indexed from the top-left corner.
    ///
    /// # Examples
    ///
    /// Writing a pixel to the fourth column, second row on an 8-by-8 canvas:
    ///
    /// ```
    /// # use bounce_tracer::color::Color;
    /// # use bounce_tracer::canvas::Canvas;
    /// let purple = Color::rgb(255.0, 0.0, 255.0);
    /// let mut canvas = Canvas::new(8, 8);
    /// canvas.write_pixel(4, 2, &purple);
    /// assert_eq!(canvas.read_pixel(4, 2).unwrap(), purple);
    /// ```
    pub fn write_pixel(&mut self, x: usize, y: usize, pixel: &Color) {
        if x >= self.width || y >= self.height {
            return;
        }

        self.pixels[(y * self.width) + x] = *pixel;
    }

    /// Reads a color from a location on the `Canvas`.
    ///
    /// Returns `None` if the location is out-of-bounds.
    pub fn read_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None
        }

        Some(self.pixels[(y * self.width) + x])
    }
}

/// Somewhere to show an image while it renders.
///
/// The renderer periodically copies the whole framebuffer into the sink
/// with `set_pixel`, then calls `present`. Between refreshes it asks
/// `pause_requested`; if the sink wants a pause, every worker is parked
/// before `hold` is called, and rendering resumes once `hold` returns.
pub trait FrameSink {
    fn set_pixel(&mut self, x: usize, y: usize, color: Color);

    /// Called after a full frame has been written.
    fn present(&mut self) {}

    fn pause_requested(&mut self) -> bool {
        false
    }

    /// Called while every worker is parked. Rendering resumes on return.
    fn hold(&mut self) {}
}

impl FrameSink for Canvas {
    fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        self.write_pixel(x, y, &color);
    }
}

/// A sink which discards every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn set_pixel(&mut self, _x: usize, _y: usize, _color: Color) {}
}

/// The pixels being rendered, shared between workers.
///
/// Each pixel is an 8-bit RGB triple packed into one atomic word. Only the
/// task tracing a pixel ever writes it, so relaxed loads and stores are
/// enough; readers (the preview) may see a pixel a bounce or two behind.
#[derive(Debug)]
pub struct Framebuffer {
    pub width: usize,
    pub height: usize,
    pixels: Vec<AtomicU32>,
}

fn pack(rgb: [u8; 3]) -> u32 {
    (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32
}

fn unpack(word: u32) -> [u8; 3] {
    [(word >> 16) as u8, (word >> 8) as u8, word as u8]
}

impl Framebuffer {
    /// Creates a black framebuffer.
    pub fn new(width: usize, height: usize) -> Framebuffer {
        Framebuffer {
            width,
            height,
            pixels: (0..width * height).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// The index of the pixel at column `x`, row `y`.
    pub fn index(&self, x: usize, y: usize) -> usize {
        (y * self.width) + x
    }

    pub fn load(&self, index: usize) -> [u8; 3] {
        unpack(self.pixels[index].load(Ordering::Relaxed))
    }

    pub fn store(&self, index: usize, rgb: [u8; 3]) {
        self.pixels[index].store(pack(rgb), Ordering::Relaxed);
    }

    /// Adds a color to a pixel, saturating each channel at 255. Returns the
    /// new pixel value.
    pub fn accumulate(&self, index: usize, color: Color) -> [u8; 3] {
        let sum = Color::from(self.load(index)) + color;
        let rgb = sum.to_rgb8();
        self.store(index, rgb);

        rgb
    }

    /// Copies every pixel into a sink, then presents it.
    pub fn present_to(&self, sink: &mut dyn FrameSink) {
        for y in 0..self.height {
            for x in 0..self.width {
                let rgb = self.load(self.index(x, y));
                sink.set_pixel(x, y, Color::from(rgb));
            }
        }

        sink.present();
    }

    /// Copies the current pixels into a new canvas.
    pub fn snapshot(&self) -> Canvas {
        let mut canvas = Canvas::new(self.width, self.height);
        self.present_to(&mut canvas);

        canvas
    }
}

#[test]
fn ppm_header_and_pixels() {
    let mut c = Canvas::new(5, 3);
    c.write_pixel(0, 0, &Color::rgb(300.0, 0.0, 0.0));
    c.write_pixel(2, 1, &Color::rgb(0.0, 127.9, 0.0));
    c.write_pixel(4, 2, &Color::rgb(-10.0, 0.0, 255.0));

    let mut out = Vec::new();
    c.write_ppm(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "P3");
    assert_eq!(lines[1], "5 3");
    assert_eq!(lines[2], "255");
    assert!(lines[3].starts_with("255 0 0 0 0 0"));
    assert!(text.contains(" 0 127 0 "));
    assert!(text.ends_with("0 0 255\n"));
}

#[test]
fn ppm_lines_stay_under_70_columns() {
    let mut c = Canvas::new(10, 2);
    for y in 0..2 {
        for x in 0..10 {
            c.write_pixel(x, y, &Color::rgb(255.0, 204.0, 153.0));
        }
    }

    let mut out = Vec::new();
    c.write_ppm(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.lines().all(|l| l.len() <= 70));
    assert_eq!(text.split_whitespace().count(), 4 + 10 * 2 * 3);
}

#[test]
fn out_of_bounds_pixels_are_ignored() {
    let mut c = Canvas::new(2, 2);
    c.write_pixel(2, 0, &Color::white());

    assert_eq!(c.read_pixel(2, 0), None);
    assert_eq!(c, Canvas::new(2, 2));
}

#[test]
fn canvas_converts_to_image() {
    let mut c = Canvas::new(3, 2);
    c.write_pixel(2, 1, &Color::rgb(10.0, 20.0, 30.0));

    let img = c.to_image();
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(2, 1), &Rgb([10, 20, 30]));
    assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
}

#[test]
fn framebuffer_accumulates_with_saturation() {
    let fb = Framebuffer::new(2, 2);
    let i = fb.index(1, 1);

    assert_eq!(fb.accumulate(i, Color::rgb(200.0, 10.0, 0.5)), [200, 10, 0]);
    assert_eq!(fb.accumulate(i, Color::rgb(100.0, 10.0, 0.0)), [255, 20, 0]);
    assert_eq!(fb.load(fb.index(0, 0)), [0, 0, 0]);
}

#[test]
fn framebuffer_snapshot_matches_pixels() {
    let fb = Framebuffer::new(3, 2);
    fb.store(fb.index(2, 0), [1, 2, 3]);

    let c = fb.snapshot();
    assert_eq!(c.read_pixel(2, 0), Some(Color::rgb(1.0, 2.0, 3.0)));
    assert_eq!(c.read_pixel(0, 1), Some(Color::black()));
}
