use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::time::Instant;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref REQUEST_COUNTER: Counter = Counter::with_opts(
        Opts::new("meme_requests_total", "Total number of meme requests")
    ).unwrap();

    pub static ref RESPONSE_TIME: Histogram = Histogram::with_opts(
        HistogramOpts::new("meme_response_duration_seconds", "Response time for meme requests")
    ).unwrap();

    pub static ref MEMES_GENERATED: Counter = Counter::with_opts(
        Opts::new("memes_generated_total", "Total number of memes generated")
    ).unwrap();

    pub static ref RENDER_TIME: Histogram = Histogram::with_opts(
        HistogramOpts::new("meme_render_duration_seconds", "Time spent drawing caption overlays")
    ).unwrap();

    pub static ref GALLERY_SIZE: Gauge = Gauge::with_opts(
        Opts::new("gallery_size", "Number of memes currently in the gallery")
    ).unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(REQUEST_COUNTER.clone())).unwrap();
    REGISTRY.register(Box::new(RESPONSE_TIME.clone())).unwrap();
    REGISTRY.register(Box::new(MEMES_GENERATED.clone())).unwrap();
    REGISTRY.register(Box::new(RENDER_TIME.clone())).unwrap();
    REGISTRY.register(Box::new(GALLERY_SIZE.clone())).unwrap();
}

pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

pub struct Timer {
    start: Instant,
    histogram: &'static Histogram,
}

impl Timer {
    pub fn new(histogram: &'static Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.histogram.observe(duration.as_secs_f64());
    }
}
