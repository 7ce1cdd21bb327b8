use std::path::PathBuf;

use crate::grain::params::GrainType;

use super::*;

fn power_entries(tokens: &[String]) -> Vec<&str> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.as_str() == "--power")
        .map(|(i, _)| tokens[i + 1].as_str())
        .collect()
}

#[test]
fn gray_only_emits_gray_and_default_power() {
    let params = GrainParameters {
        gray: true,
        ..Default::default()
    };
    let tokens = map_to_arguments(&params);
    assert_eq!(tokens, vec!["--gray", "--power", "1.0,0.5,0.5"]);
    for absent in ["--scale", "--type", "--sat", "--sharpen"] {
        assert!(!tokens.iter().any(|t| t == absent), "{absent}");
    }
}

#[test]
fn every_field_is_emitted_in_stable_order() {
    let params = GrainParameters {
        scale: Some(0.5),
        grain_power: Some(0.8),
        shadows: Some(0.2),
        highs: Some(0.4),
        grain_type: Some(GrainType::LargeCoarse),
        grain_saturation: Some(0.6),
        sharpen: Some(2),
        gray: true,
    };
    assert_eq!(
        map_to_arguments(&params),
        vec![
            "--scale",
            "0.5",
            "--type",
            "4",
            "--sat",
            "0.6",
            "--sharpen",
            "2",
            "--gray",
            "--power",
            "0.8,0.4,0.2",
        ]
    );
}

#[test]
fn power_is_always_present_exactly_once() {
    let samples = [
        GrainParameters::default(),
        GrainParameters {
            shadows: Some(0.0),
            ..Default::default()
        },
        GrainParameters {
            highs: Some(1.0),
            sharpen: Some(0),
            ..Default::default()
        },
        GrainParameters {
            grain_power: Some(2.0),
            gray: true,
            ..Default::default()
        },
    ];
    for params in samples {
        let tokens = map_to_arguments(&params);
        let powers = power_entries(&tokens);
        assert_eq!(powers.len(), 1, "{tokens:?}");
        let fields: Vec<f64> = powers[0].split(',').map(|v| v.parse().unwrap()).collect();
        let i = params.intensity();
        assert_eq!(fields, vec![i.global, i.highlights, i.shadows]);
    }
}

#[test]
fn mapping_is_deterministic() {
    let params = GrainParameters {
        scale: Some(1.0),
        grain_power: Some(0.5),
        ..Default::default()
    };
    assert_eq!(map_to_arguments(&params), map_to_arguments(&params));
}

#[test]
fn output_and_input_come_last() {
    let params = GrainParameters {
        scale: Some(1.0),
        grain_power: Some(0.5),
        ..Default::default()
    };
    let out = PathBuf::from("/tmp/out file.png");
    let input = PathBuf::from("/tmp/in.png");
    let args = GrainArgs::from_params(&params).output_input(&out, &input);

    let tokens: Vec<String> = args
        .as_slice()
        .iter()
        .map(|t| t.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        tokens,
        vec![
            "--scale",
            "1.0",
            "--power",
            "0.5,0.5,0.5",
            "-o",
            "/tmp/out file.png",
            "/tmp/in.png",
        ]
    );
    assert_eq!(args.len(), 7);
    assert!(!args.is_empty());
    assert!(!GrainArgs::from_params(&GrainParameters::default()).is_empty());
    assert_eq!(
        args.to_string(),
        "--scale 1.0 --power 0.5,0.5,0.5 -o /tmp/out file.png /tmp/in.png"
    );
}
