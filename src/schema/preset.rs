// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use super::{Connection, KeypointSchema};

/// COCO-Pose body-part names, in dataset order.
pub const COCO_BODYPARTS: [&str; 17] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

/// COCO-Pose skeleton structure (pairs of keypoint indices)
pub const COCO_SKELETON: [[usize; 2]; 19] = [
    [15, 13], // left ankle to left knee
    [13, 11], // left knee to left hip
    [16, 14], // right ankle to right knee
    [14, 12], // right knee to right hip
    [11, 12], // left hip to right hip
    [5, 11],  // left shoulder to left hip
    [6, 12],  // right shoulder to right hip
    [5, 6],   // left shoulder to right shoulder
    [5, 7],   // left shoulder to left elbow
    [6, 8],   // right shoulder to right elbow
    [7, 9],   // left elbow to left wrist
    [8, 10],  // right elbow to right wrist
    [1, 2],   // left eye to right eye
    [0, 1],   // nose to left eye
    [0, 2],   // nose to right eye
    [1, 3],   // left eye to left ear
    [2, 4],   // right eye to right ear
    [3, 5],   // left ear to left shoulder
    [4, 6],   // right ear to right shoulder
];

impl KeypointSchema {
    /// The 17-point COCO person schema.
    #[must_use]
    pub fn coco_person() -> Self {
        Self::new(
            "coco_person",
            COCO_BODYPARTS,
            COCO_SKELETON.iter().copied().map(Connection::from),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_person_is_valid() {
        let schema = KeypointSchema::coco_person();
        assert_eq!(schema.len(), 17);
        assert_eq!(schema.connections.len(), 19);
        assert!(schema.validate(None).is_empty());
    }
}
