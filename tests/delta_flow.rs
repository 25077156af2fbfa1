//! End-to-end runs of both synchronization flows against a mock release
//! feed serving fixture archives.

use std::io::Write;
use std::path::PathBuf;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::{Compression, write::DeflateEncoder};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cvemirror::{AssetResolution, MirrorConfig, ReleaseLocator, run_delta, run_snapshot};

/// Minimal zip writer for fixtures: local headers, central directory, EOCD.
#[derive(Default)]
struct ZipFixture {
    data: Vec<u8>,
    central_directory: Vec<u8>,
    count: u16,
}

impl ZipFixture {
    fn entry(mut self, name: &str, contents: &[u8], compress: bool) -> Self {
        let method: u16 = if compress { 8 } else { 0 };
        let payload = if compress {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(contents).unwrap();
            encoder.finish().unwrap()
        } else {
            contents.to_vec()
        };
        let crc = {
            let mut crc = flate2::Crc::new();
            crc.update(contents);
            crc.sum()
        };
        let lfh_offset = self.data.len() as u32;

        let zip = &mut self.data;
        zip.extend_from_slice(b"PK\x03\x04");
        zip.write_u16::<LittleEndian>(20).unwrap();
        zip.write_u16::<LittleEndian>(0).unwrap();
        zip.write_u16::<LittleEndian>(method).unwrap();
        zip.write_u16::<LittleEndian>(0).unwrap();
        zip.write_u16::<LittleEndian>(0x21).unwrap();
        zip.write_u32::<LittleEndian>(crc).unwrap();
        zip.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        zip.write_u32::<LittleEndian>(contents.len() as u32).unwrap();
        zip.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        zip.write_u16::<LittleEndian>(0).unwrap();
        zip.extend_from_slice(name.as_bytes());
        zip.extend_from_slice(&payload);

        let cd = &mut self.central_directory;
        cd.extend_from_slice(b"PK\x01\x02");
        cd.write_u16::<LittleEndian>(20).unwrap();
        cd.write_u16::<LittleEndian>(20).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(method).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0x21).unwrap();
        cd.write_u32::<LittleEndian>(crc).unwrap();
        cd.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        cd.write_u32::<LittleEndian>(contents.len() as u32).unwrap();
        cd.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u32::<LittleEndian>(0).unwrap();
        cd.write_u32::<LittleEndian>(lfh_offset).unwrap();
        cd.extend_from_slice(name.as_bytes());

        self.count += 1;
        self
    }

    fn build(mut self) -> Vec<u8> {
        let cd_offset = self.data.len() as u32;
        let cd_size = self.central_directory.len() as u32;
        self.data.extend_from_slice(&self.central_directory);

        let zip = &mut self.data;
        zip.extend_from_slice(b"PK\x05\x06");
        zip.write_u16::<LittleEndian>(0).unwrap();
        zip.write_u16::<LittleEndian>(0).unwrap();
        zip.write_u16::<LittleEndian>(self.count).unwrap();
        zip.write_u16::<LittleEndian>(self.count).unwrap();
        zip.write_u32::<LittleEndian>(cd_size).unwrap();
        zip.write_u32::<LittleEndian>(cd_offset).unwrap();
        zip.write_u16::<LittleEndian>(0).unwrap();
        self.data
    }
}

fn config_for(server: &MockServer, base_dir: PathBuf) -> MirrorConfig {
    MirrorConfig {
        base_dir,
        api_url: format!("{}/releases", server.uri()),
        download_base: format!("{}/download", server.uri()),
        resolution: AssetResolution::Templated,
    }
}

#[tokio::test]
async fn delta_run_merges_records_and_cleans_up() {
    let server = MockServer::start().await;
    let date = ReleaseLocator::yesterday_utc();
    let tag = format!("cve_{date}_at_end_of_day");

    Mock::given(method("GET"))
        .and(path("/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"tag_name": "cve_2020-01-01_2300Z", "assets": []},
            {"tag_name": tag, "assets": []},
        ])))
        .mount(&server)
        .await;

    let archive = ZipFixture::default()
        .entry("CVE-2024-23456.json", b"{\"cveId\": \"CVE-2024-23456\"}", false)
        .entry("CVE-2023-1234.json", b"{\"cveId\": \"CVE-2023-1234\"}", true)
        .entry("CVE-2020-7.json", b"{\"cveId\": \"CVE-2020-7\"}", false)
        .build();
    Mock::given(method("GET"))
        .and(path(format!(
            "/download/{tag}/{date}_delta_CVEs_at_end_of_day.zip"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let base = root.path().join("mirror");
    run_delta(&config_for(&server, base.clone())).await.unwrap();

    assert_eq!(
        std::fs::read(base.join("cves/2024/23xxx/CVE-2024-23456.json")).unwrap(),
        b"{\"cveId\": \"CVE-2024-23456\"}"
    );
    assert_eq!(
        std::fs::read(base.join("cves/2023/1xxx/CVE-2023-1234.json")).unwrap(),
        b"{\"cveId\": \"CVE-2023-1234\"}"
    );

    // Scratch directory and downloaded archive are gone afterwards
    assert!(!base.join("deltaCves").exists());
    assert!(
        !base
            .join(format!("{date}_end_of_day_delta_cve_data.zip"))
            .exists()
    );
}

#[tokio::test]
async fn delta_run_is_a_noop_when_feed_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let base = root.path().join("mirror");
    run_delta(&config_for(&server, base.clone())).await.unwrap();

    // No download happened and nothing was created
    assert!(!base.exists());
}

#[tokio::test]
async fn snapshot_run_unpacks_nested_archive_and_records_tag() {
    let server = MockServer::start().await;
    let tag = "cve_2025-01-15_2300Z";

    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"tag_name": tag})),
        )
        .mount(&server)
        .await;

    let inner = ZipFixture::default()
        .entry(
            "cves/2025/11xxx/CVE-2025-11111.json",
            b"{\"cveId\": \"CVE-2025-11111\"}",
            true,
        )
        .build();
    let outer = ZipFixture::default()
        .entry("cves.zip", &inner, false)
        .entry("records.txt", b"1 record", false)
        .build();
    Mock::given(method("GET"))
        .and(path(format!(
            "/download/{tag}/2025-01-15_all_CVEs_at_midnight.zip.zip"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(outer))
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let base = root.path().join("mirror");
    let config = config_for(&server, base.clone());

    run_snapshot(&config).await.unwrap();

    assert_eq!(
        std::fs::read(base.join("cves/2025/11xxx/CVE-2025-11111.json")).unwrap(),
        b"{\"cveId\": \"CVE-2025-11111\"}"
    );
    assert_eq!(std::fs::read(base.join("records.txt")).unwrap(), b"1 record");
    assert!(!base.join("cves.zip").exists());
    assert!(!base.join("2025-01-15_all_CVEs_at_midnight.zip.zip").exists());
    assert_eq!(
        std::fs::read_to_string(base.join(".last_release")).unwrap(),
        tag
    );

    // Second run sees the recorded tag and downloads nothing; the .expect(1)
    // on the archive mock verifies that when the server shuts down.
    run_snapshot(&config).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(base.join(".last_release")).unwrap(),
        tag
    );
}
