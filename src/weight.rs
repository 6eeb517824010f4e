//! Roll weight from its dimensions and basis weight.

/// Tons produced by `roll_count` rolls of `width_mm`, each `length_m` long,
/// at `substance_gsm` grams per square meter.
///
/// Any zero or non-finite input yields `0.0`. Signs are not checked; callers
/// validate their inputs first.
pub fn tons(width_mm: u32, substance_gsm: f64, length_m: f64, roll_count: u64) -> f64 {
    if width_mm == 0 || roll_count == 0 {
        return 0.0;
    }
    if !substance_gsm.is_finite() || !length_m.is_finite() || substance_gsm == 0.0 || length_m == 0.0
    {
        return 0.0;
    }
    let weight_kg =
        (width_mm as f64 / 1000.0) * length_m * (substance_gsm / 1000.0) * roll_count as f64;
    weight_kg / 1000.0
}
