mod logging;
mod test_utils;
