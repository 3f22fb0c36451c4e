//! `;`-separated metadata files
//!
//! ```text
//! FileName;PersonsName;PersonsFamilyName;DateOfBirth;DateOfDeath;DateOfPhotography;PersonsJob;Photographer;Link
//! DP002045.jpg;Jens Johannes;Andersen;07.06.1846;04.04.1902;1875-1919;lærer;Jørgensen, Chresten Estrup (11.9.1843-21.11.1879) fotograf;http://...
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{
    ImageInfo, ImageVariant, MetadataRecord, Person, RES_CLOSE, RES_CUTOUT_70, RES_CUTOUT_90,
    RES_CUTOUT_90_WIDE, RES_ORIGINAL,
};
use crate::resources::ResourceRoots;

const EXPECTED_FIELDS: usize = 9;

/// Turn files and directories into the list of files to load
pub(super) fn expand_sources(sources: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for source in sources {
        if source.is_file() {
            files.push(source.clone());
            continue;
        }
        if !source.is_dir() {
            warn!(path = %source.display(), "Metadata source does not exist");
            continue;
        }

        let entries = match std::fs::read_dir(source) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %source.display(), error = %e, "Unable to list metadata directory");
                continue;
            }
        };
        let mut csvs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        csvs.sort();
        if csvs.is_empty() {
            warn!(path = %source.display(), "No CSV files in metadata directory");
        }
        files.extend(csvs);
    }
    files
}

pub(super) fn load_file(
    path: &Path,
    roots: &ResourceRoots,
    records: &mut HashMap<String, MetadataRecord>,
) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unable to read metadata file");
            return;
        }
    };

    let before = records.len();
    // First line is the header
    for (line_no, line) in content.lines().enumerate().skip(1) {
        let Some(record) = parse_line(line, line_no + 1, roots) else {
            continue;
        };
        let id = record.image.id.clone();
        if records.contains_key(&id) {
            warn!(id = %id, path = %path.display(), line = line_no + 1, "Duplicate image id, keeping the first");
            continue;
        }
        records.insert(id, record);
    }

    info!(
        path = %path.display(),
        added = records.len() - before,
        "Loaded metadata file"
    );
}

fn parse_line(line: &str, line_no: usize, roots: &ResourceRoots) -> Option<MetadataRecord> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        debug!(line = line_no, "Skipping blank or comment line");
        return None;
    }

    let fields: Vec<&str> = line.split(';').map(str::trim).collect();
    if fields.len() != EXPECTED_FIELDS {
        warn!(
            line = line_no,
            expected = EXPECTED_FIELDS,
            actual = fields.len(),
            content = %line,
            "Unexpected field count, skipping line"
        );
        return None;
    }

    let file_name = fields[0];
    let id = strip_extension(file_name);
    if id.is_empty() {
        warn!(line = line_no, "Empty file name, skipping line");
        return None;
    }

    let image_url = |collection: &str| {
        roots
            .has_collection(collection)
            .then(|| roots.url_for(collection, file_name))
    };

    let image = ImageInfo {
        id: id.to_string(),
        micro_url: image_url(RES_CLOSE),
        tiny_url: image_url(RES_CUTOUT_70),
        medium_url: image_url(RES_CUTOUT_90),
        full_url: image_url(RES_CUTOUT_90_WIDE),
        raw_url: image_url(RES_ORIGINAL),
        creation_date: dates_to_str(fields[5]),
        data_url: fields[8].to_string(),
        variants: roots
            .roots()
            .iter()
            .map(|root| ImageVariant {
                url: roots.url_for(&root.name, file_name),
                group: root.name.clone(),
                description: root.description.clone(),
            })
            .collect(),
    };

    let person = Person {
        first_name: fields[1].to_string(),
        last_name: fields[2].to_string(),
        birthday: dates_to_str(fields[3]),
        deathday: dates_to_str(fields[4]),
        occupation: fields[6].to_string(),
    };

    let image_creators = fields[7]
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(parse_photographer)
        .collect();

    Some(MetadataRecord {
        image,
        person,
        image_creators,
    })
}

/// `DP002045.jpg` → `DP002045`. Only lowercase extensions are stripped.
fn strip_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if ext.chars().all(|c| c.is_ascii_lowercase()) => stem,
        _ => file_name,
    }
}

/// Normalize a single date: `07.06.1846` and `7.6.1846` become `1846-06-07`,
/// `1843` stays `1843`.
pub fn parse_date(date: &str) -> String {
    let mut parts: Vec<String> = date
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.len() < 2 {
                format!("0{p}")
            } else {
                p.to_string()
            }
        })
        .collect();
    parts.reverse();
    parts.join("-")
}

/// Normalize a date or a `-` separated range of dates: `1895-1907` becomes
/// `1895 to 1907`.
pub fn dates_to_str(dates: &str) -> String {
    dates
        .split('-')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(parse_date)
        .collect::<Vec<_>>()
        .join(" to ")
}

/// Parse `Last, First (birth-death) occupation`. Missing parts stay empty.
pub fn parse_photographer(photographer: &str) -> Person {
    let mut person = Person::default();

    let Some((last, rest)) = photographer.split_once(',') else {
        person.last_name = photographer.trim().to_string();
        // Studios such as "Atelier Moderne" carry no first name
        if !photographer.contains('&') && !photographer.contains("Atelier") {
            debug!(photographer = %photographer, "Only able to extract last name");
        }
        return person;
    };
    person.last_name = last.trim().to_string();

    let Some((first, after_paren)) = rest.split_once('(') else {
        person.first_name = rest.trim().to_string();
        return person;
    };
    person.first_name = first.trim().to_string();

    let (dates, occupation) = after_paren.split_once(')').unwrap_or((after_paren, ""));
    person.occupation = occupation.trim().to_string();

    let mut dates = dates.splitn(2, '-').map(str::trim);
    if let Some(birth) = dates.next() {
        person.birthday = parse_date(birth);
    }
    if let Some(death) = dates.next().filter(|d| !d.is_empty()) {
        person.deathday = parse_date(death);
    }

    person
}
