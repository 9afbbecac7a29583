// src/trait_extraction.rs - Morphometric and colorimetric traits per image

use image::RgbImage;

use crate::color_analysis::{calculate_color_indices, split_channels, Channels};
use crate::config::LabelClass;
use crate::errors::Result;
use crate::image_io::split_file_name;
use crate::label_mask::{
    check_mask_dimensions, count_equal, create_bool_mask, rescale_nearest, LabelMask, MaskSelector,
    PLANT_REGION,
};
use crate::output::{TraitRecord, TraitValue};
use crate::shape_analysis::{region_properties, RegionProperties};

/// Region properties reported per label, in output order
const MORPHOMETRIC_TRAITS: [&str; 10] = [
    "area",
    "filled_area",
    "convex_area",
    "equivalent_diameter",
    "major_axis_length",
    "minor_axis_length",
    "perimeter",
    "eccentricity",
    "extent",
    "solidity",
];

fn property_value(props: &RegionProperties, name: &str) -> TraitValue {
    match name {
        "area" => TraitValue::Count(props.area),
        "filled_area" => TraitValue::Count(props.filled_area),
        "convex_area" => TraitValue::Count(props.convex_area),
        "equivalent_diameter" => TraitValue::Measure(props.equivalent_diameter),
        "major_axis_length" => TraitValue::Measure(props.major_axis_length),
        "minor_axis_length" => TraitValue::Measure(props.minor_axis_length),
        "perimeter" => TraitValue::Measure(props.perimeter),
        "eccentricity" => TraitValue::Measure(props.eccentricity),
        "extent" => TraitValue::Measure(props.extent),
        _ => TraitValue::Measure(props.solidity),
    }
}

/// Value reported when the label is absent from the mask
fn missing_value(name: &str) -> TraitValue {
    if name.contains("area") {
        TraitValue::Count(0)
    } else {
        TraitValue::Measure(f64::NAN)
    }
}

/// Add `{label}_{index}` color traits for the selected pixels
fn add_color_indices(
    record: &mut TraitRecord,
    channels: &Channels,
    mask: &LabelMask,
    label: &str,
    selector: MaskSelector,
) {
    let bool_mask = create_bool_mask(mask, selector);
    let indices = calculate_color_indices(channels, &bool_mask);
    for (name, value) in indices.named_values() {
        record.insert(format!("{}_{}", label, name), TraitValue::Measure(value));
    }
}

/// Add morphometric traits for one label class
///
/// `scaled` is the mask at original resolution. The background class reports
/// the image size and its own pixel count, then measures the whole plant
/// region in its place.
fn add_morphometry(
    record: &mut TraitRecord,
    scaled: &LabelMask,
    label: &LabelClass,
    ignore_label: Option<u8>,
) {
    let (name, selector) = if label.value == 0 {
        let (width, height) = scaled.dimensions();
        record.insert("total_area", TraitValue::Count(width as u64 * height as u64));
        record.insert(
            format!("{}_area", label.name),
            TraitValue::Count(count_equal(scaled, label.value)),
        );
        (PLANT_REGION, MaskSelector::PlantRegion { ignore_label })
    } else {
        (label.name.as_str(), MaskSelector::Class(label.value))
    };

    let props = region_properties(&create_bool_mask(scaled, selector));

    for trait_name in MORPHOMETRIC_TRAITS {
        let value = match &props {
            Some(p) => property_value(p, trait_name),
            None => missing_value(trait_name),
        };
        record.insert(format!("{}_{}", name, trait_name), value);
    }

    let aspect_ratio = props.map(|p| p.aspect_ratio()).unwrap_or(f64::NAN);
    record.insert(format!("{}_aspect_ratio", name), TraitValue::Measure(aspect_ratio));
}

/// Calculate traits from a plant rosette segmentation
///
/// # Arguments
/// * `mask` - Predicted label mask, same size as `image`
/// * `image` - Original RGB image
/// * `scale_ratio` - Factor by which the mask was downscaled
/// * `file_name` - Image file name, reported as name and format
/// * `ignore_label` - Label value excluded from the plant region
/// * `labels` - Label classes in output order
pub fn measure_traits(
    mask: &LabelMask,
    image: &RgbImage,
    scale_ratio: f64,
    file_name: &str,
    ignore_label: Option<u8>,
    labels: &[LabelClass],
) -> Result<TraitRecord> {
    check_mask_dimensions(image, mask, file_name)?;

    let (name, format) = split_file_name(file_name);
    let mut record = TraitRecord::new();
    record.insert("file", TraitValue::Text(name.to_string()));
    record.insert("format", TraitValue::Text(format.to_string()));

    let channels = split_channels(image);
    // Morphometry is reported at the resolution of the original image
    let scaled = rescale_nearest(mask, scale_ratio);

    add_color_indices(
        &mut record,
        &channels,
        mask,
        PLANT_REGION,
        MaskSelector::PlantRegion { ignore_label },
    );

    for label in labels {
        add_morphometry(&mut record, &scaled, label, ignore_label);

        if label.value == 0 {
            continue;
        }
        add_color_indices(&mut record, &channels, mask, &label.name, MaskSelector::Class(label.value));
    }

    Ok(record)
}
