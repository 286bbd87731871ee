//! GTFS Loader (C4): the pipeline in spec §4.4 — hash the bundle, check the
//! cache, parse CSV with explicit typings, build indices, resolve
//! translations, derive route variants, compute calendar aggregates, and
//! persist a compressed snapshot.

use std::collections::HashMap;

use async_zip::base::read::mem::ZipFileReader;
use async_zip::error::ZipError;
use futures_util::{io::AsyncReadExt, StreamExt};

use crate::cache::{CacheError, CacheStore};

use super::calendar::CalendarIndex;
use super::feed::{Agency, FeedSnapshot, Route, Shape, Stop, StopTime, Trip};
use super::reader::{read_gtfs_from_zip, GtfsError, GtfsItem};
use super::snapshot::{self, SnapshotError};
use super::translations::{SimpleTranslation, TableTranslation, TranslationIndex};

pub use super::reader::GtfsError as ReaderError;

#[derive(thiserror::Error, Debug)]
pub enum GtfsLoadError {
    #[error("required GTFS file {0} is missing from the bundle")]
    MissingRequiredFile(&'static str),

    #[error("bundle has neither calendar.txt nor calendar_dates.txt")]
    NoCalendarSource,

    #[error("GTFS parse error: {0}")]
    Parse(#[from] GtfsError),

    #[error("zip error: {0}")]
    Zip(#[from] ZipError),

    #[error("snapshot (de)serialization error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type LoadResult<T> = Result<T, GtfsLoadError>;

/// The files the content hash covers, in the fixed order spec §4.4 step 1
/// requires. Only the ones actually present in the bundle are hashed.
const FIXED_FILE_ORDER: &[&str] = &[
    "agency.txt",
    "stops.txt",
    "routes.txt",
    "trips.txt",
    "stop_times.txt",
    "calendar.txt",
    "calendar_dates.txt",
    "shapes.txt",
    "translations.txt",
    "feed_info.txt",
];

const REQUIRED_FILES: &[&str] = &["stops.txt", "routes.txt", "trips.txt", "stop_times.txt"];

pub struct LoadedGtfs {
    pub snapshot: FeedSnapshot,
    pub from_cache: bool,
}

/// Reads every entry's raw bytes for the filenames in `FIXED_FILE_ORDER` that
/// are present in the archive, used both for the content hash and (for
/// `translations.txt`) for a dedicated sync CSV parse.
async fn read_raw_files(zip: &ZipFileReader) -> LoadResult<HashMap<String, Vec<u8>>> {
    let mut out = HashMap::new();

    for idx in 0..usize::MAX {
        let reader = match zip.reader_with_entry(idx).await {
            Ok(entry) => entry,
            Err(ZipError::EntryIndexOutOfBounds) => break,
            Err(e) => return Err(e.into()),
        };

        let filename = reader.entry().filename().clone().into_string()?;
        if !FIXED_FILE_ORDER.contains(&filename.as_str()) {
            continue;
        }

        let mut reader = reader;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        out.insert(filename, buf);
    }

    Ok(out)
}

fn content_hash(raw_files: &HashMap<String, Vec<u8>>) -> String {
    let pairs: Vec<(&str, &[u8])> = FIXED_FILE_ORDER
        .iter()
        .filter_map(|name| raw_files.get(*name).map(|bytes| (*name, bytes.as_slice())))
        .collect();
    snapshot::content_hash(&pairs)
}

fn parse_translations(raw_files: &HashMap<String, Vec<u8>>) -> TranslationIndex {
    let Some(bytes) = raw_files.get("translations.txt") else {
        return TranslationIndex::default();
    };

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes.as_slice());
    let Ok(headers) = reader.headers().cloned() else {
        return TranslationIndex::default();
    };

    if headers.iter().any(|h| h == "table_name") {
        let rows: Vec<TableTranslation> = reader.into_deserialize().filter_map(|r| r.ok()).collect();
        TranslationIndex::build_from_table(rows)
    } else if headers.iter().any(|h| h == "trans_id") {
        // Simple translations join by default stop name; the caller supplies
        // the name->id map once stops are known, so this pass alone can't
        // resolve them — return empty and let the caller merge in a second
        // pass via `build_from_simple`.
        TranslationIndex::default()
    } else {
        TranslationIndex::default()
    }
}

fn parse_simple_translations(raw_files: &HashMap<String, Vec<u8>>) -> Vec<SimpleTranslation> {
    let Some(bytes) = raw_files.get("translations.txt") else {
        return Vec::new();
    };
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes.as_slice());
    let Ok(headers) = reader.headers().cloned() else {
        return Vec::new();
    };
    if !headers.iter().any(|h| h == "trans_id") {
        return Vec::new();
    }
    reader.into_deserialize().filter_map(|r: Result<SimpleTranslation, _>| r.ok()).collect()
}

fn route_color_hex(color: rgb::RGB8) -> String {
    format!("{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

/// Parses the full bundle into a `FeedSnapshot`, dropping and logging
/// individual malformed rows rather than aborting the whole load (spec §4.4
/// parsing policy), but failing with `MissingRequiredFile` if a required file
/// never produced a single valid row.
async fn parse_bundle(zip: ZipFileReader, present: &[String]) -> LoadResult<FeedSnapshot> {
    for required in REQUIRED_FILES {
        if !present.iter().any(|f| f == required) {
            return Err(GtfsLoadError::MissingRequiredFile(required));
        }
    }
    if !present.iter().any(|f| f == "calendar.txt") && !present.iter().any(|f| f == "calendar_dates.txt") {
        return Err(GtfsLoadError::NoCalendarSource);
    }

    let include: Vec<(String, u64)> = present.iter().map(|f| (f.clone(), 0)).collect();
    let mut stream = Box::pin(read_gtfs_from_zip(zip, include));

    let mut gtfs_stops = Vec::new();
    let mut gtfs_routes = Vec::new();
    let mut gtfs_trips = Vec::new();
    let mut gtfs_stop_times = Vec::new();
    let mut gtfs_shapes = Vec::new();
    let mut gtfs_calendars = Vec::new();
    let mut gtfs_calendar_dates = Vec::new();
    let mut gtfs_agencies = Vec::new();

    let mut malformed_rows = 0u64;

    while let Some(item) = stream.next().await {
        match item {
            Ok((GtfsItem::Stop(s), _)) => gtfs_stops.push(s),
            Ok((GtfsItem::Route(r), _)) => gtfs_routes.push(r),
            Ok((GtfsItem::Trip(t), _)) => gtfs_trips.push(t),
            Ok((GtfsItem::StopTime(st), _)) => gtfs_stop_times.push(st),
            Ok((GtfsItem::Shape(sh), _)) => gtfs_shapes.push(sh),
            Ok((GtfsItem::Calendar(c), _)) => gtfs_calendars.push(c),
            Ok((GtfsItem::CalendarDate(cd), _)) => gtfs_calendar_dates.push(cd),
            Ok((GtfsItem::Agency(a), _)) => gtfs_agencies.push(a),
            Ok((GtfsItem::FeedInfo(_), _)) => {}
            Err(e) => {
                malformed_rows += 1;
                log::warn!("dropping malformed GTFS row: {e}");
            }
        }
    }

    if malformed_rows > 0 {
        log::warn!("{malformed_rows} malformed GTFS rows dropped during load");
    }
    if gtfs_stops.is_empty() {
        return Err(GtfsLoadError::MissingRequiredFile("stops.txt"));
    }
    if gtfs_routes.is_empty() {
        return Err(GtfsLoadError::MissingRequiredFile("routes.txt"));
    }

    let stop_ids: std::collections::HashSet<String> = gtfs_stops.iter().map(|s| s.stop_id.clone()).collect();
    let route_ids: std::collections::HashSet<String> = gtfs_routes.iter().map(|r| r.route_id.clone()).collect();

    let stops_by_id: HashMap<String, Stop> = gtfs_stops
        .into_iter()
        .map(|s| {
            let coordinates = match (s.stop_lat, s.stop_lon) {
                (Some(lat), Some(lon)) => Some((lat, lon)),
                _ => None,
            };
            (
                s.stop_id.clone(),
                Stop {
                    id: s.stop_id,
                    name: s.stop_name,
                    coordinates,
                    parent_station: s.parent_station,
                    location_type: s.location_type,
                    platform_code: s.platform_code,
                    timezone: s.stop_timezone,
                },
            )
        })
        .collect();

    let mut routes_by_id: HashMap<String, Route> = gtfs_routes
        .into_iter()
        .map(|r| {
            (
                r.route_id.clone(),
                Route {
                    id: r.route_id,
                    short_name: r.route_short_name,
                    long_name: r.route_long_name,
                    route_type: r.route_type,
                    color: route_color_hex(r.route_color),
                    text_color: route_color_hex(r.route_text_color),
                    trip_ids: Vec::new(),
                },
            )
        })
        .collect();

    let mut trips_by_id: HashMap<String, Trip> = HashMap::new();
    let mut trips_by_route: HashMap<String, Vec<String>> = HashMap::new();
    let mut trips_by_service: HashMap<String, Vec<String>> = HashMap::new();

    for t in gtfs_trips {
        if !route_ids.contains(&t.route_id) {
            malformed_rows += 1;
            log::warn!("dropping trip {:?}: unknown route_id {:?}", t.trip_id, t.route_id);
            continue;
        }
        trips_by_route.entry(t.route_id.clone()).or_default().push(t.trip_id.clone());
        trips_by_service.entry(t.service_id.clone()).or_default().push(t.trip_id.clone());
        if let Some(route) = routes_by_id.get_mut(&t.route_id) {
            route.trip_ids.push(t.trip_id.clone());
        }
        trips_by_id.insert(
            t.trip_id.clone(),
            Trip {
                id: t.trip_id,
                route_id: t.route_id,
                service_id: t.service_id,
                direction_id: t.direction_id.map(|d| d as u8),
                headsign: t.trip_headsign,
                shape_id: t.shape_id,
            },
        );
    }

    let mut stop_times_by_trip: HashMap<String, Vec<StopTime>> = HashMap::new();
    for st in gtfs_stop_times {
        if !trips_by_id.contains_key(&st.trip_id) {
            continue;
        }
        if !stop_ids.contains(&st.stop_id) {
            malformed_rows += 1;
            log::warn!("dropping stop_time on trip {:?}: unknown stop_id {:?}", st.trip_id, st.stop_id);
            continue;
        }
        stop_times_by_trip.entry(st.trip_id).or_default().push(StopTime {
            stop_sequence: st.stop_sequence,
            stop_id: st.stop_id,
            arrival_time: st.arrival_time,
            departure_time: st.departure_time,
            headsign: st.stop_headsign,
        });
    }
    for times in stop_times_by_trip.values_mut() {
        times.sort_by_key(|st| st.stop_sequence);
    }

    let mut shapes_by_id: HashMap<String, Vec<(usize, f64, f64)>> = HashMap::new();
    for sh in gtfs_shapes {
        shapes_by_id.entry(sh.shape_id).or_default().push((sh.shape_pt_sequence, sh.shape_pt_lat, sh.shape_pt_lon));
    }
    let shapes_by_id: HashMap<String, Shape> = shapes_by_id
        .into_iter()
        .map(|(id, mut points)| {
            points.sort_by_key(|(seq, _, _)| *seq);
            (
                id.clone(),
                Shape {
                    id,
                    points: points.into_iter().map(|(_, lat, lon)| (lat, lon)).collect(),
                },
            )
        })
        .collect();

    let agencies: Vec<Agency> = gtfs_agencies
        .into_iter()
        .map(|a| Agency {
            id: a.agency_id,
            name: a.agency_name,
            timezone: a.agency_timezone,
        })
        .collect();

    let calendar = CalendarIndex::build(gtfs_calendars, gtfs_calendar_dates);

    let mut snapshot = FeedSnapshot {
        stops_by_id,
        routes_by_id,
        trips_by_id,
        trips_by_route,
        trips_by_service,
        stop_times_by_trip,
        shapes_by_id,
        agencies,
        calendar,
        translations: TranslationIndex::default(),
        route_variants: HashMap::new(),
        content_hash: String::new(),
    };

    snapshot.derive_route_variants();
    Ok(snapshot)
}

/// Loads one GTFS bundle (as raw zip bytes), validating the cache first.
/// `provider` names the cache subtree (`cache/<provider>/.gtfs_cache`).
pub async fn load_from_zip_bytes(
    provider: &str,
    zip_bytes: bytes::Bytes,
    cache: &CacheStore,
) -> LoadResult<LoadedGtfs> {
    let zip = ZipFileReader::new(zip_bytes).await?;
    let raw_files = read_raw_files(&zip).await?;
    let hash = content_hash(&raw_files);

    let hash_key = format!("{provider}_gtfs_cache_hash");
    let blob_path = format!("{provider}.gtfs_cache");

    if let Some(cached_hash) = cache.get::<String>(&hash_key).await {
        if cached_hash == hash {
            if let Some(bytes) = cache.get_blob(&blob_path).await {
                if let Ok(snapshot) = snapshot::deserialize(&bytes) {
                    log::info!("{provider}: GTFS snapshot cache hit (hash {hash})");
                    return Ok(LoadedGtfs { snapshot, from_cache: true });
                }
                log::warn!("{provider}: cached GTFS snapshot is corrupt, reparsing");
            }
        }
    }

    log::info!("{provider}: parsing GTFS bundle (hash {hash})");
    let present: Vec<String> = raw_files.keys().cloned().collect();
    let mut snapshot = parse_bundle(zip, &present).await?;

    let simple = parse_simple_translations(&raw_files);
    let mut translations = parse_translations(&raw_files);
    if !simple.is_empty() {
        let name_to_id: HashMap<String, String> =
            snapshot.stops_by_id.values().map(|s| (s.name.clone(), s.id.clone())).collect();
        translations.merge(TranslationIndex::build_from_simple(simple, &name_to_id));
    }
    snapshot.translations = translations;
    snapshot.content_hash = hash.clone();

    let compressed = snapshot::serialize(&snapshot)?;
    cache.set_blob(&blob_path, &compressed).await?;
    cache.set(&hash_key, &hash, None).await?;

    Ok(LoadedGtfs { snapshot, from_cache: false })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn route_color_hex_formats_uppercase() {
        let color = rgb::RGB8::new(0x0a, 0xbc, 0xde);
        assert_eq!(route_color_hex(color), "0ABCDE");
    }
}
