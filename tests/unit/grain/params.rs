use super::*;

#[test]
fn decimals_keep_trailing_zero_for_integral_values() {
    assert_eq!(format_decimal(1.0), "1.0");
    assert_eq!(format_decimal(0.0), "0.0");
    assert_eq!(format_decimal(2.0), "2.0");
    assert_eq!(format_decimal(0.5), "0.5");
    assert_eq!(format_decimal(0.75), "0.75");
    assert_eq!(format_decimal(0.1), "0.1");
}

#[test]
fn intensity_defaults_and_order() {
    let params = GrainParameters::default();
    assert_eq!(params.intensity().to_string(), "1.0,0.5,0.5");

    let params = GrainParameters {
        grain_power: Some(0.75),
        shadows: Some(0.1),
        highs: Some(0.3),
        ..Default::default()
    };
    // global, highlights, shadows
    assert_eq!(params.intensity().to_string(), "0.75,0.3,0.1");
}

#[test]
fn grain_type_accepts_only_known_modes() {
    assert_eq!(GrainType::try_from(1).unwrap(), GrainType::SmallFine);
    assert_eq!(GrainType::try_from(4).unwrap(), GrainType::LargeCoarse);
    assert!(GrainType::try_from(0).is_err());
    assert!(GrainType::try_from(5).is_err());

    assert_eq!(" 3 ".parse::<GrainType>().unwrap(), GrainType::LargeFine);
    assert!("fine".parse::<GrainType>().is_err());
    assert_eq!(GrainType::SmallCoarse.to_string(), "2");
}

#[test]
fn validate_rejects_non_finite_and_negative_values() {
    assert!(GrainParameters::default().validate().is_ok());

    for bad in [
        GrainParameters {
            scale: Some(0.0),
            ..Default::default()
        },
        GrainParameters {
            scale: Some(f64::NAN),
            ..Default::default()
        },
        GrainParameters {
            grain_power: Some(-0.1),
            ..Default::default()
        },
        GrainParameters {
            highs: Some(f64::INFINITY),
            ..Default::default()
        },
        GrainParameters {
            grain_saturation: Some(-1.0),
            ..Default::default()
        },
    ] {
        let err = bad.validate().unwrap_err();
        assert!(matches!(err, FilmgrainError::Validation(_)), "{bad:?}");
    }
}

#[test]
fn json_uses_camel_case_and_accepts_form_aliases() {
    let params: GrainParameters = serde_json::from_str(
        r#"{"scale": 1.0, "grainPower": 0.5, "grainType": 2, "grainSaturation": 0.6, "gray": true}"#,
    )
    .unwrap();
    assert_eq!(params.scale, Some(1.0));
    assert_eq!(params.grain_power, Some(0.5));
    assert_eq!(params.grain_type, Some(GrainType::SmallCoarse));
    assert_eq!(params.grain_saturation, Some(0.6));
    assert!(params.gray);
    assert_eq!(params.sharpen, None);

    let aliased: GrainParameters =
        serde_json::from_str(r#"{"grain_power": 0.2, "grain_type": 1, "grain_sat": 0.4}"#).unwrap();
    assert_eq!(aliased.grain_power, Some(0.2));
    assert_eq!(aliased.grain_type, Some(GrainType::SmallFine));
    assert_eq!(aliased.grain_saturation, Some(0.4));

    assert!(serde_json::from_str::<GrainParameters>(r#"{"grainType": 9}"#).is_err());

    let json = serde_json::to_value(GrainParameters {
        grain_type: Some(GrainType::LargeFine),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(json, serde_json::json!({"grainType": 3, "gray": false}));
}
