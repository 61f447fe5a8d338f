// src/schedule.rs
//! Turns a day of time-of-day slots into timed programmes, inferring stop
//! times the radio sources do not publish.

use chrono::{DateTime, Duration, FixedOffset, Timelike};

use crate::error::DropReason;
use crate::programme::{Programme, Slot, parse_number};
use crate::xmltv::Tv;

/// "HH:MM" → (hour, minute). Exactly two integer parts, any digit script.
fn parse_hm(time: &str) -> Option<(u32, u32)> {
    let (h, m) = time.split_once(':')?;
    if m.contains(':') {
        return None;
    }
    Some((parse_number(h.trim())?, parse_number(m.trim())?))
}

/// Anchors one slot to `day`, keeping its title/description/image.
fn anchor(slot: &Slot, day: &DateTime<FixedOffset>) -> Result<(Programme, u32), DropReason> {
    let title = slot.title.trim();
    if title.is_empty() {
        return Err(DropReason::EmptyTitle);
    }
    let (hour, minute) = parse_hm(&slot.time).ok_or(DropReason::BadTime)?;
    let start = day
        .with_hour(hour)
        .and_then(|d| d.with_minute(minute))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .ok_or(DropReason::OutOfRange)?;

    let programme = Programme {
        start,
        stop: None,
        title: title.to_string(),
        description: slot.description.clone(),
        image: slot.image.clone(),
    };
    Ok((programme, slot.duration))
}

/// Resolves start and stop for one day of slots, in appearance order.
///
/// Slots with an empty title or an unparsable time are dropped first. A stop
/// comes from the slot's own duration when it has one, otherwise from the
/// next surviving slot's start if that is strictly later. The last slot
/// without a duration stays open ended.
pub fn resolve_day(slots: &[Slot], day: &DateTime<FixedOffset>) -> Vec<Programme> {
    let anchored: Vec<(Programme, u32)> = slots
        .iter()
        .filter_map(|slot| match anchor(slot, day) {
            Ok(v) => Some(v),
            Err(reason) => {
                tracing::debug!("[schedule] dropped {:?} at {:?}: {reason}", slot.title, slot.time);
                None
            }
        })
        .collect();

    let next_starts: Vec<Option<DateTime<FixedOffset>>> = anchored
        .iter()
        .skip(1)
        .map(|(p, _)| Some(p.start))
        .chain(std::iter::once(None))
        .collect();

    anchored
        .into_iter()
        .zip(next_starts)
        .map(|((mut p, duration), next)| {
            p.stop = if duration > 0 {
                Duration::try_minutes(i64::from(duration)).and_then(|d| p.start.checked_add_signed(d))
            } else {
                next.filter(|n| *n > p.start)
            };
            p
        })
        .collect()
}

/// Resolves `slots` against `day` and appends them to `tv` under `tvg_id`.
/// Returns the number of guide entries added.
pub fn append_radio(tv: &mut Tv, slots: &[Slot], tvg_id: &str, day: &DateTime<FixedOffset>) -> usize {
    tv.add_programmes(tvg_id, resolve_day(slots, day))
}
