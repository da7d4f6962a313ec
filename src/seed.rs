use crate::model::*;

fn facilities(flags: [bool; 6]) -> Facilities {
    let [projector, lab, accessible, whiteboard, audio, smartboard] = flags;
    Facilities {
        projector,
        lab,
        accessible,
        whiteboard,
        audio,
        smartboard,
    }
}

/// The fixed sample campus: 7 rooms across Main, Science, Engineering and Arts.
pub fn sample_rooms() -> Vec<Room> {
    //                         proj   lab    acc    wb     audio  smart
    vec![
        Room::new("101", "Main", 50, Some(1), facilities([true, false, true, true, true, false])),
        Room::new("102", "Main", 30, Some(1), facilities([true, false, true, true, false, true])),
        Room::new("201", "Science", 40, Some(2), facilities([true, true, false, true, true, false])),
        Room::new("301", "Engineering", 60, Some(3), facilities([true, true, true, true, true, true])),
        Room::new("LAB-A", "Science", 25, Some(1), facilities([true, true, true, false, false, true])),
        Room::new("401", "Engineering", 100, Some(4), facilities([true, false, true, true, true, true])),
        Room::new("AUD-1", "Arts", 200, Some(1), facilities([true, false, true, false, true, false])),
    ]
}
