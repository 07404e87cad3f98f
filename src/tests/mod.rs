
mod analysis_tests;
mod manifest_tests;
mod res_tests;
