//! Human-readable disposal tips.

use crate::model::{BinCategory, FitStatus, Volume, WasteType};

/// Items above this volume get a pickup suggestion.
pub const LARGE_ITEM_THRESHOLD_ML: f64 = 2000.0;

const PLASTIC_TIPS: [&str; 3] = [
    "Remove any labels or caps before recycling",
    "Rinse clean before disposal",
    "Check if it's recyclable in your area",
];

const PAPER_TIPS: [&str; 3] = [
    "Remove any plastic or metal components",
    "Keep dry to prevent contamination",
    "Shred sensitive documents before recycling",
];

const GLASS_TIPS: [&str; 3] = [
    "Remove metal caps and labels",
    "Rinse clean before recycling",
    "Don't mix different colored glass",
];

const ORGANIC_TIPS: [&str; 3] = [
    "Compost if possible",
    "Remove any non-organic materials",
    "Keep in sealed container to prevent odors",
];

const BREAK_DOWN_TIP: &str = "Consider breaking down into smaller pieces";
const LARGER_BIN_TIP: &str = "Look for larger disposal bins in your area";
const CAUTION_TIP: &str = "This item is quite large - ensure it fits properly";
const PICKUP_TIP: &str = "Large item - consider scheduling a pickup";

/// Material tips for a waste type; empty for types without specific guidance.
#[must_use]
pub fn material_tips(waste_type: WasteType) -> &'static [&'static str] {
    match waste_type {
        WasteType::Plastic => &PLASTIC_TIPS,
        WasteType::Paper => &PAPER_TIPS,
        WasteType::Glass => &GLASS_TIPS,
        WasteType::Organic => &ORGANIC_TIPS,
        _ => &[],
    }
}

/// Ordered disposal tips: material first, then fit remediation, then the
/// large-item pickup hint. An empty list is a valid result.
#[must_use]
pub fn disposal_tips(
    waste_type: WasteType,
    _bin_category: BinCategory,
    fit_status: FitStatus,
    waste_volume: Volume,
) -> Vec<&'static str> {
    let mut tips = material_tips(waste_type).to_vec();

    match fit_status {
        FitStatus::DoesNotFit => tips.extend([BREAK_DOWN_TIP, LARGER_BIN_TIP]),
        FitStatus::PartialFit => tips.push(CAUTION_TIP),
        FitStatus::Fits => {}
    }

    if waste_volume.millilitres() > LARGE_ITEM_THRESHOLD_ML {
        tips.push(PICKUP_TIP);
    }

    tips
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ml(value: f64) -> Volume {
        Volume::new(value).expect("valid volume")
    }

    #[test]
    fn partial_plastic_gets_material_and_caution_tips() {
        let tips = disposal_tips(
            WasteType::Plastic,
            BinCategory::Recycling,
            FitStatus::PartialFit,
            ml(1200.0),
        );
        assert_eq!(
            tips,
            vec![
                "Remove any labels or caps before recycling",
                "Rinse clean before disposal",
                "Check if it's recyclable in your area",
                CAUTION_TIP,
            ]
        );
    }

    #[test]
    fn large_organic_item_that_fits_gets_pickup_tip() {
        let tips = disposal_tips(
            WasteType::Organic,
            BinCategory::Organic,
            FitStatus::Fits,
            ml(2500.0),
        );
        assert_eq!(tips.len(), 4);
        assert_eq!(tips.get(..3), Some(ORGANIC_TIPS.as_slice()));
        assert_eq!(tips.last(), Some(&PICKUP_TIP));
        assert!(!tips.contains(&CAUTION_TIP));
    }

    #[test]
    fn non_fitting_item_gets_both_remediation_tips_in_order() {
        let tips = disposal_tips(
            WasteType::Metal,
            BinCategory::Recycling,
            FitStatus::DoesNotFit,
            ml(3000.0),
        );
        assert_eq!(tips, vec![BREAK_DOWN_TIP, LARGER_BIN_TIP, PICKUP_TIP]);
    }

    #[test]
    fn pickup_threshold_is_exclusive() {
        let at_threshold = disposal_tips(
            WasteType::Other,
            BinCategory::General,
            FitStatus::Fits,
            ml(LARGE_ITEM_THRESHOLD_ML),
        );
        assert!(at_threshold.is_empty());
    }

    #[test]
    fn unmapped_small_fitting_item_yields_no_tips() {
        let tips = disposal_tips(
            WasteType::Pharmaceutical,
            BinCategory::Hazardous,
            FitStatus::Fits,
            ml(50.0),
        );
        assert!(tips.is_empty());
    }

    #[test]
    fn tips_are_deterministic() {
        for waste_type in WasteType::ALL {
            for status in [FitStatus::Fits, FitStatus::PartialFit, FitStatus::DoesNotFit] {
                let bin = waste_type.bin_category();
                let first = disposal_tips(waste_type, bin, status, ml(2100.0));
                let second = disposal_tips(waste_type, bin, status, ml(2100.0));
                assert_eq!(first, second);
            }
        }
    }
}
