pub mod scan_profile;
