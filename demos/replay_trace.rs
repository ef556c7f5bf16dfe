//! Replay a synthetic detection trace and print the analysis record

use therapy_interactions::{analyze_trace, AnalysisConfig, AnalysisEncoder, DetectionTrace, RawDetection};

fn row(class_id: u32, x: f64, w: f64) -> RawDetection {
    RawDetection {
        x,
        y: 0.5,
        w,
        h: 0.4,
        confidence: 0.9,
        class_id,
    }
}

fn main() {
    // the caretaker walks towards the child and back over 3 seconds at 10 fps
    let frames = (0..30)
        .map(|i| {
            let t = i as f64 / 29.0;
            let caretaker_x = 0.9 - 0.8 * (1.0 - (2.0 * t - 1.0).abs());
            vec![row(0, 0.2, 0.2), row(1, caretaker_x, 0.3), row(2, 0.25, 0.1)]
        })
        .collect();
    let trace = DetectionTrace::new("demo-session.mp4", 10.0, frames);
    let config = AnalysisConfig::default();

    match analyze_trace(&trace, &config)
        .and_then(|a| AnalysisEncoder::new().encode_to_json(&a, true))
    {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}
