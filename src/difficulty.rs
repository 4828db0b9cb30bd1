/// Horses with fewer podiums than this count towards a race's difficulty.
pub const MN_THRESHOLD: u32 = 3;

/// Share of the field (0-100, rounded) whose MN points are below [`MN_THRESHOLD`].
///
/// An empty field has difficulty 0.
pub fn race_difficulty(mn_points: &[u32], field_size: usize) -> u32 {
    if field_size == 0 {
        return 0;
    }
    let weak = mn_points.iter().filter(|mn| **mn < MN_THRESHOLD).count();
    (100.0 * weak as f64 / field_size as f64).round() as u32
}
