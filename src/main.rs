use sound_alert_classifier::{
    audio_file::WavLoader, AlertEvent, LabelTable, MicCapture, OnnxScorer, Pipeline,
    PipelineConfig, Result, SoundClassifier, SAMPLE_RATE,
};

use log::info;
use std::env;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage:");
        println!("  {} file <audio.wav> <model.onnx> <labels.txt>", args[0]);
        println!("  {} stream <model.onnx> <labels.txt> [config.json]", args[0]);
        return Ok(());
    }

    match args[1].as_str() {
        "file" => {
            if args.len() < 5 {
                println!("Please provide an audio file, a model and a label table");
                return Ok(());
            }
            classify_file(&args[2], &args[3], &args[4])
        }
        "stream" => {
            if args.len() < 4 {
                println!("Please provide a model and a label table");
                return Ok(());
            }
            let config = match args.get(4) {
                Some(path) => PipelineConfig::from_file(path)?,
                None => PipelineConfig::default(),
            };
            classify_stream(&args[2], &args[3], config).await
        }
        _ => {
            println!("Invalid command. Use 'file' or 'stream'");
            Ok(())
        }
    }
}

fn build_classifier(
    model_path: &str,
    labels_path: &str,
    config: &PipelineConfig,
) -> Result<SoundClassifier> {
    let labels = LabelTable::from_file(labels_path)?;
    let scorer = OnnxScorer::load(model_path, config.window_size, config.acceleration)?;
    let classifier = SoundClassifier::new(
        Box::new(scorer),
        labels,
        config.window_size,
        config.stride,
        config.top_k,
    )?;
    Ok(classifier)
}

fn classify_file(audio_path: &str, model_path: &str, labels_path: &str) -> Result<()> {
    info!("classifying file: {}", audio_path);

    let config = PipelineConfig::default();
    let mut classifier = build_classifier(model_path, labels_path, &config)?;

    let audio = WavLoader::new(SAMPLE_RATE).load(audio_path)?;
    info!(
        "loaded {} samples ({:.2} seconds)",
        audio.len(),
        audio.len() as f32 / SAMPLE_RATE as f32
    );

    let ranked = classifier.classify_slice(&audio)?;
    if ranked.is_empty() {
        println!("Recording is shorter than one classification window");
        return Ok(());
    }

    println!("Top predictions:");
    for entry in &ranked {
        println!("  {:<40} {:.4}", entry.label, entry.score);
    }

    let timing = classifier.timing();
    println!(
        "Timing: preprocess {:.3}ms, inference {:.3}ms, postprocess {:.3}ms",
        timing.preprocessing_nanos as f64 / 1e6,
        timing.inference_nanos as f64 / 1e6,
        timing.postprocessing_nanos as f64 / 1e6,
    );

    Ok(())
}

async fn classify_stream(
    model_path: &str,
    labels_path: &str,
    config: PipelineConfig,
) -> Result<()> {
    info!("starting live sound-alert classification");

    let classifier = build_classifier(model_path, labels_path, &config)?;
    let capture = MicCapture::new(SAMPLE_RATE)?;

    let mut pipeline = Pipeline::new(&config, classifier, Box::new(capture));
    pipeline.set_alert_handler(|event: &AlertEvent| {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(err) => log::error!("failed to serialize alert: {}", err),
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    pipeline.run(shutdown_rx).await?;
    pipeline.close();
    Ok(())
}
