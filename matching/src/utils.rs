// Copyright 2021 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::cmp::Ordering;

/// Compares floats ascending, treating `NaN` as greater than anything else so it sorts last.
pub(crate) fn nan_safe_f32_cmp_asc(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => unreachable!(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_safe_f32_cmp_asc() {
        let mut values = [0.5, f32::NAN, 0.1, 0.3];
        values.sort_by(|&a, &b| nan_safe_f32_cmp_asc(a, b));
        assert_eq!(&values[..3], &[0.1, 0.3, 0.5]);
        assert!(values[3].is_nan());
    }
}
