use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// A small extract of the carrier file, unsorted by `created_dt`.
pub const CARRIERS_CSV: &str = "\
created_dt,legal_name,p_state,power_units,p_zip_code,out_of_service_date
2023-05-02,Acme Co,NV,12,01234,03/15/2023
2023-01-09,Beta LLC,CA,,55555,
2023-03-21,Acme Trucking,NV,3,89101,01/01/2023
2022-11-30,Gamma Freight,TX,40,75001,11/30/2022
";

/// Write `content` to `name` inside a fresh temp dir. Keep the dir alive for the test.
pub fn write_csv(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    (dir, path)
}
