pub mod db_utils;
pub mod email_index;
