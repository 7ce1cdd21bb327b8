use super::*;

fn parse(fields: &[(&str, &str)]) -> FilmgrainResult<GrainParameters> {
    let mut params = GrainParameters::default();
    for (name, value) in fields {
        apply_field(&mut params, name, value)?;
    }
    Ok(params)
}

#[test]
fn frontend_field_names_map_onto_parameters() {
    let params = parse(&[
        ("scale", "1"),
        ("src_type", "1"),
        ("grain_power", "0.75"),
        ("shadows", "0.1"),
        ("highs", "0.2"),
        ("grain_type", "3"),
        ("grain_sat", "0.6"),
        ("sharpen", "2"),
        ("gray", "false"),
    ])
    .unwrap();

    assert_eq!(
        params,
        GrainParameters {
            scale: Some(1.0),
            grain_power: Some(0.75),
            shadows: Some(0.1),
            highs: Some(0.2),
            grain_type: Some(GrainType::LargeFine),
            grain_saturation: Some(0.6),
            sharpen: Some(2),
            gray: false,
        }
    );
}

#[test]
fn camel_case_aliases_are_accepted() {
    let params = parse(&[
        ("grainPower", "0.5"),
        ("grainType", "2"),
        ("grainSaturation", "0.3"),
        ("gray", "on"),
    ])
    .unwrap();
    assert_eq!(params.grain_power, Some(0.5));
    assert_eq!(params.grain_type, Some(GrainType::SmallCoarse));
    assert_eq!(params.grain_saturation, Some(0.3));
    assert!(params.gray);
}

#[test]
fn blank_and_unknown_fields_are_ignored() {
    let params = parse(&[("scale", "  "), ("mystery", "42")]).unwrap();
    assert_eq!(params, GrainParameters::default());
}

#[test]
fn unparseable_values_are_validation_errors() {
    for fields in [
        [("scale", "big")],
        [("sharpen", "1.5")],
        [("grain_type", "7")],
        [("gray", "maybe")],
    ] {
        let err = parse(&fields).unwrap_err();
        assert!(matches!(err, FilmgrainError::Validation(_)), "{fields:?}");
    }
}
