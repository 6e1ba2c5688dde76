macro_rules! emit {
    ($output:expr, $indent:expr, $($format:tt)*) => {{
        for _ in 0..$indent {
            $output.write_char('\t')?;
        }

        writeln!($output, $($format)*)
    }};
}
