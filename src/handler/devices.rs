use std::collections::HashMap;

use crate::model::Device;

/// Collapses rows sharing a `device_id` to the one used most recently.
/// The result is ordered by `last_used`, newest first.
pub fn unique_devices(rows: Vec<Device>) -> Vec<Device> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut devices: Vec<Device> = Vec::with_capacity(rows.len());

    for row in rows {
        match index.get(&row.device_id) {
            Some(&position) => {
                if row.last_used > devices[position].last_used {
                    devices[position] = row;
                }
            },
            None => {
                index.insert(row.device_id.to_owned(), devices.len());
                devices.push(row);
            },
        }
    }

    devices.sort_by(|a, b| b.last_used.cmp(&a.last_used));
    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn device(id: i64, device_id: &str, last_used: DateTime<Utc>) -> Device {
        Device {
            id,
            device_id: device_id.to_owned(),
            device_name: None,
            platform: None,
            user_agent: None,
            user_id: None,
            last_used,
            created_at: last_used,
        }
    }

    #[test]
    fn keeps_most_recent_row_per_device() {
        let now = Utc::now();
        let rows = vec![
            device(1, "phone", now - Duration::minutes(10)),
            device(2, "laptop", now - Duration::minutes(5)),
            device(3, "phone", now),
            device(4, "laptop", now - Duration::hours(1)),
        ];

        let devices = unique_devices(rows);

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, 3);
        assert_eq!(devices[1].id, 2);
    }

    #[test]
    fn empty_input_yields_no_devices() {
        assert!(unique_devices(vec![]).is_empty());
    }
}
