//! Named facial regions over the 468-point face-mesh topology.
//!
//! Each region carries its own raw-diff thresholds: how far a single
//! landmark's color (Euclidean RGB distance) or brightness (channel mean)
//! must move between two frames to count as changed. Cheeks are flatter
//! and less textured than eyes, hence the lower thresholds there.

use serde::{Deserialize, Serialize};

/// A named group of landmark indices evaluated independently.
///
/// Index sets may overlap between regions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacialRegion {
    pub name: String,
    pub landmark_indices: Vec<usize>,
    pub color_threshold: f64,
    pub brightness_threshold: f64,
}

impl FacialRegion {
    pub fn new(
        name: impl Into<String>,
        landmark_indices: Vec<usize>,
        color_threshold: f64,
        brightness_threshold: f64,
    ) -> Self {
        Self {
            name: name.into(),
            landmark_indices,
            color_threshold,
            brightness_threshold,
        }
    }

    /// The six reference regions with their tuned thresholds.
    pub fn reference_set() -> Vec<FacialRegion> {
        vec![
            Self::new("left_eye", LEFT_EYE.to_vec(), 12.25, 6.5),
            Self::new("right_eye", RIGHT_EYE.to_vec(), 12.5, 6.6),
            Self::new("nose", NOSE.to_vec(), 11.0, 5.8),
            Self::new("mouth", MOUTH.to_vec(), 9.0, 4.6),
            Self::new("left_cheek", LEFT_CHEEK.to_vec(), 6.85, 3.35),
            Self::new("right_cheek", RIGHT_CHEEK.to_vec(), 8.8, 4.45),
        ]
    }
}

const LEFT_EYE: &[usize] = &[
    113, 225, 224, 223, 222, 221, 189, 190, 226, 247, 130, 33, 161, 160, 159, 158, 157, 173, 30,
    29, 27, 28, 56, 7, 25, 31, 228, 110, 163, 229, 24, 144, 230, 23, 145, 153, 231, 22, 232, 26,
    154, 233, 112, 155, 244, 243, 133,
];

const RIGHT_EYE: &[usize] = &[
    413, 414, 441, 286, 442, 258, 443, 257, 444, 259, 445, 260, 342, 467, 446, 359, 261, 255, 448,
    339, 449, 254, 450, 253, 451, 452, 256, 453, 341, 464, 463, 362, 382, 381, 380, 374, 373, 390,
    249, 263, 466, 388, 387, 386, 385, 384, 398,
];

const NOSE: &[usize] = &[
    168, 188, 122, 6, 351, 412, 217, 174, 196, 197, 419, 399, 437, 209, 198, 236, 3, 195, 248, 456,
    420, 429, 129, 49, 131, 134, 51, 5, 281, 363, 360, 279, 102, 48, 115, 220, 45, 4, 275, 440,
    344, 358, 278, 64, 219, 235, 298, 240, 59, 166, 218, 75, 79, 60, 239, 237, 99, 97, 238, 20, 44,
    241, 242, 141, 125, 2, 94, 19, 1, 274, 354, 370, 462, 461, 458, 250, 459, 457, 326, 328, 290,
    309, 438, 305, 289, 392, 460, 455, 439, 327, 294,
];

const MOUTH: &[usize] = &[
    57, 43, 182, 83, 313, 406, 335, 273, 287, 410, 393, 164, 167, 165, 92, 186, 14, 15, 16, 17, 18,
    317, 316, 315, 402, 403, 404, 405, 318, 319, 320, 321, 324, 325, 307, 308, 299, 391, 407, 408,
    409, 415, 322, 310, 76, 272, 270, 314, 271, 303, 269, 312, 268, 302, 267, 0, 11, 12, 13, 82,
    38, 72, 37, 39, 73, 41, 81, 40, 74, 42, 185, 184, 183, 191, 61, 62, 78, 146, 77, 96, 106, 80,
    88, 89, 90, 91, 181, 180, 179, 178, 84, 85, 86, 87,
];

const LEFT_CHEEK: &[usize] = &[
    266, 357, 350, 349, 348, 347, 346, 340, 372, 264, 343, 277, 329, 330, 280, 345, 447, 352, 366,
    401, 435, 376, 433, 367, 411, 416, 364, 427, 434, 394, 430, 422, 432, 436, 426, 423, 425, 371,
];

const RIGHT_CHEEK: &[usize] = &[
    128, 34, 227, 137, 177, 215, 138, 135, 169, 143, 116, 123, 147, 213, 192, 214, 210, 202, 212,
    187, 111, 117, 50, 207, 216, 206, 205, 118, 119, 101, 36, 203, 142, 100, 120, 47, 121, 108,
    114,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::FACE_MESH_LANDMARK_COUNT;
    use rstest::rstest;

    #[test]
    fn test_reference_set_has_six_regions_in_order() {
        let names: Vec<_> = FacialRegion::reference_set()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(
            names,
            ["left_eye", "right_eye", "nose", "mouth", "left_cheek", "right_cheek"]
        );
    }

    #[rstest]
    #[case::left_eye(0, 47)]
    #[case::right_eye(1, 47)]
    #[case::nose(2, 91)]
    #[case::mouth(3, 94)]
    #[case::left_cheek(4, 38)]
    #[case::right_cheek(5, 39)]
    fn test_reference_region_sizes(#[case] position: usize, #[case] expected: usize) {
        let regions = FacialRegion::reference_set();
        assert_eq!(regions[position].landmark_indices.len(), expected);
    }

    #[test]
    fn test_reference_indices_fit_face_mesh() {
        for region in FacialRegion::reference_set() {
            assert!(!region.landmark_indices.is_empty());
            assert!(region
                .landmark_indices
                .iter()
                .all(|&i| i < FACE_MESH_LANDMARK_COUNT));
        }
    }

    #[test]
    fn test_reference_thresholds() {
        let regions = FacialRegion::reference_set();
        assert_eq!(regions[0].color_threshold, 12.25);
        assert_eq!(regions[0].brightness_threshold, 6.5);
        assert_eq!(regions[4].color_threshold, 6.85);
        assert_eq!(regions[4].brightness_threshold, 3.35);
    }
}
