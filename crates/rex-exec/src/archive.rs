use std::path::Path;

use flate2::read::GzDecoder;

/// Gunzip `src` into `dest` on the blocking pool.
pub(crate) async fn gunzip(src: &Path, dest: &Path) -> std::io::Result<()> {
    let src = src.to_owned();
    let dest = dest.to_owned();
    tokio::task::spawn_blocking(move || {
        let input = std::fs::File::open(&src)?;
        let mut decoder = GzDecoder::new(std::io::BufReader::new(input));
        let mut output = std::fs::File::create(&dest)?;
        std::io::copy(&mut decoder, &mut output)?;
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::other(e.to_string()))?
}
