//! Local maxima of 1-D signals with flat tops.

/// Find local maxima in a 1-D signal, collapsing flat plateaus to one index.
///
/// A peak is a run of equal samples whose left neighbour and right neighbour
/// are both strictly smaller. Each such run reports its midpoint
/// `(first + last) / 2` (rounded down). Runs touching either end of the
/// signal never qualify, since one of their neighbours is missing.
///
/// Works on any ordered sample type; for a boolean in-transit mask
/// (`false < true`) every interior run of `true` values yields one index.
///
/// # Examples
/// ```
/// use shared::algo::find_plateau_peaks;
///
/// let mask = [false, true, true, true, false, false, true, false];
/// assert_eq!(find_plateau_peaks(&mask), vec![2, 6]);
/// ```
pub fn find_plateau_peaks<T: PartialOrd + Copy>(signal: &[T]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }

    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }

            if signal[ahead] < signal[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead - 1;
            }
        }
        i += 1;
    }

    peaks
}
