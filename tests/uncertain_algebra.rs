//! `UncertainBoolean::and_then` must never raise certainty above the lower
//! of its two inputs, regardless of which side is more or less confident.

use chainhal::uncertain::{Certainty, UncertainBoolean};

#[test]
fn combining_drops_to_the_lower_certainty() {
    let certain_true = UncertainBoolean::new(true, Certainty::Certain);
    let useless_true = UncertainBoolean::new(true, Certainty::Useless);

    let combined = certain_true.and_then(useless_true);
    assert_eq!(combined.certainty(), Certainty::Useless);
    assert!(combined.value());

    let combined_reversed = useless_true.and_then(certain_true);
    assert_eq!(combined_reversed.certainty(), Certainty::Useless);
}

#[test]
fn combining_never_exceeds_either_input() {
    let likely = UncertainBoolean::new(true, Certainty::Likely);
    let very_likely = UncertainBoolean::new(true, Certainty::VeryLikely);

    let combined = likely.and_then(very_likely);
    assert_eq!(combined.certainty(), Certainty::Likely);
}

#[test]
fn value_is_the_logical_and_of_both_observations() {
    let a = UncertainBoolean::new(true, Certainty::Certain);
    let b = UncertainBoolean::new(false, Certainty::Certain);
    assert!(!a.and_then(b).value());
    assert!(!b.and_then(a).value());
}
