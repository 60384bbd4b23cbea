//! Binary on-disk format loader (component C). Two little-endian streams —
//! a stops file and a routes file — are decoded into [`RawStop`]/[`RawRoute`]
//! records and handed to [`Network::build`]. Magic-byte detection picks
//! between the V1 (per-trip id + delta, requires a stable sort) and V2
//! (pre-sorted trip-id block then delta block) route layouts; the stop file
//! is layout-identical across both versions.

use std::io::Read;

use crate::error::LoadError;
use crate::network::{Network, RawRoute, RawStop, StopId, Timestamp};

const STOPS_V1_MAGIC: [u8; 4] = *b"RSTS";
const STOPS_V2_MAGIC: [u8; 4] = *b"RST2";
const ROUTES_V1_MAGIC: [u8; 4] = *b"RRTS";
const ROUTES_V2_MAGIC: [u8; 4] = *b"RRT2";

/// A read-only, bounds-checked view over an in-memory byte buffer. Loading a
/// whole stream up front instead of reading incrementally lets truncation
/// errors report an exact `found` byte count for free.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8], what: &'static str) -> Self {
        Cursor { buf, pos: 0, what }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < n {
            return Err(LoadError::Truncated { what: self.what, expected: n, found: remaining });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn magic(&mut self) -> Result<[u8; 4], LoadError> {
        self.take(4).map(|s| [s[0], s[1], s[2], s[3]])
    }

    fn u16(&mut self) -> Result<u16, LoadError> {
        self.take(2).map(|s| u16::from_le_bytes([s[0], s[1]]))
    }

    fn u32(&mut self) -> Result<u32, LoadError> {
        self.take(4).map(|s| u32::from_le_bytes(s.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, LoadError> {
        self.take(4).map(|s| i32::from_le_bytes(s.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64, LoadError> {
        self.take(8).map(|s| f64::from_le_bytes(s.try_into().unwrap()))
    }

    fn name(&mut self) -> Result<String, LoadError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

fn cumulative_row(cursor: &mut Cursor, stop_count: usize) -> Result<Vec<Timestamp>, LoadError> {
    let mut row = Vec::with_capacity(stop_count);
    let mut absolute: i64 = 0;
    for _ in 0..stop_count {
        absolute += cursor.i32()? as i64;
        row.push(absolute as Timestamp);
    }
    Ok(row)
}

/// Parses a stops file: one [`RawStop`] per record, in file order.
pub fn load_stops<R: Read>(reader: &mut R) -> Result<Vec<RawStop>, LoadError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    let mut cursor = Cursor::new(&buf, "stops");

    let magic = cursor.magic()?;
    let expected_version = match magic {
        STOPS_V1_MAGIC => 1u16,
        STOPS_V2_MAGIC => 2u16,
        other => return Err(LoadError::UnknownMagic { what: "stops", observed: other }),
    };
    let version = cursor.u16()?;
    if version != expected_version {
        return Err(LoadError::VersionMismatch { what: "stops", found: version });
    }

    let stop_count = cursor.u32()? as usize;
    let mut stops = Vec::with_capacity(stop_count);
    for _ in 0..stop_count {
        let id: StopId = cursor.u32()?;
        let name = cursor.name()?;
        let lat = cursor.f64()?;
        let lon = cursor.f64()?;

        let route_ref_count = cursor.u32()? as usize;
        let mut route_ids = Vec::with_capacity(route_ref_count);
        for _ in 0..route_ref_count {
            route_ids.push(cursor.u32()?);
        }

        let transfer_count = cursor.u32()? as usize;
        let mut transfers = Vec::with_capacity(transfer_count);
        for _ in 0..transfer_count {
            let target = cursor.u32()?;
            let walk = cursor.i32()?;
            transfers.push((target as StopId, walk.max(0) as Timestamp));
        }

        stops.push(RawStop { id, name, lat, lon, route_ids, transfers });
    }
    Ok(stops)
}

/// Parses a routes file: one [`RawRoute`] per record, with its schedule
/// decoded to absolute times and, for V1, stably sorted by first-stop time.
pub fn load_routes<R: Read>(reader: &mut R) -> Result<Vec<RawRoute>, LoadError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    let mut cursor = Cursor::new(&buf, "routes");

    let magic = cursor.magic()?;
    let (expected_version, is_v2) = match magic {
        ROUTES_V1_MAGIC => (1u16, false),
        ROUTES_V2_MAGIC => (2u16, true),
        other => return Err(LoadError::UnknownMagic { what: "routes", observed: other }),
    };
    let version = cursor.u16()?;
    if version != expected_version {
        return Err(LoadError::VersionMismatch { what: "routes", found: version });
    }

    let route_count = cursor.u32()? as usize;
    let mut routes = Vec::with_capacity(route_count);
    for _ in 0..route_count {
        let id = cursor.u32()?;
        let name = cursor.name()?;
        let stop_count = cursor.u32()? as usize;
        let trip_count = cursor.u32()? as usize;

        let mut stop_ids = Vec::with_capacity(stop_count);
        for _ in 0..stop_count {
            stop_ids.push(cursor.u32()?);
        }

        let schedule = if is_v2 {
            // Trip ids are already sorted and carry no further meaning here;
            // read and discard them, then the T*S delta block.
            for _ in 0..trip_count {
                cursor.u32()?;
            }
            let mut schedule = Vec::with_capacity(trip_count * stop_count);
            for _ in 0..trip_count {
                schedule.extend(cumulative_row(&mut cursor, stop_count)?);
            }
            schedule
        } else {
            let mut rows = Vec::with_capacity(trip_count);
            for _ in 0..trip_count {
                cursor.u32()?; // trip id, unused once sorted
                rows.push(cumulative_row(&mut cursor, stop_count)?);
            }
            // Stable sort: ties keep file order, matching the "trips of one
            // route do not overtake each other" invariant Network::build
            // checks afterward.
            rows.sort_by_key(|row| row.first().copied().unwrap_or(0));
            let mut schedule = Vec::with_capacity(trip_count * stop_count);
            for row in rows {
                schedule.extend(row);
            }
            schedule
        };

        routes.push(RawRoute { id, name, stop_ids, schedule, trip_count });
    }
    Ok(routes)
}

/// Loads both streams and builds the immutable [`Network`] in one call.
pub fn load_network<R1: Read, R2: Read>(stops: &mut R1, routes: &mut R2) -> Result<Network, LoadError> {
    let stops = load_stops(stops)?;
    let routes = load_routes(routes)?;
    Ok(Network::build(stops, routes)?)
}
