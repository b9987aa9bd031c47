use chrono::{Datelike, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::model::interval::TimeInterval;

/// 曜日ごとの利用可能時間帯。
/// 同じ曜日の時間帯は重なっていてもよく、マージはしない。
/// 候補区間がいずれか一つの時間帯に完全に収まれば利用可能とみなす。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklySchedule {
    pub monday: Vec<TimeWindow>,
    pub tuesday: Vec<TimeWindow>,
    pub wednesday: Vec<TimeWindow>,
    pub thursday: Vec<TimeWindow>,
    pub friday: Vec<TimeWindow>,
    pub saturday: Vec<TimeWindow>,
    pub sunday: Vec<TimeWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WeeklySchedule {
    pub fn windows_for(&self, weekday: Weekday) -> &[TimeWindow] {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    // 候補区間が、開始時刻の曜日のいずれかの時間帯に完全に収まるかどうか。
    // 日をまたぐ区間は単一の曜日に収まらないため常に false。
    // 時間帯が設定されていない曜日も false
    pub fn covers(&self, interval: &TimeInterval) -> bool {
        let start = interval.start();
        let end = interval.end();
        if start.date_naive() != end.date_naive() {
            return false;
        }
        let start_time = start.time();
        let end_time = end.time();
        self.windows_for(start.weekday())
            .iter()
            .any(|w| w.start <= start_time && end_time <= w.end)
    }
}
