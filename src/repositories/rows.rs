//! Lectura tolerante de filas
//!
//! Las vistas de reporte del panel de administración omiten la fila que no
//! se puede decodificar y siguen con el resto del lote.

use crate::utils::sanitize::sanitize_for_log;

/// Devuelve las filas decodificadas y registra las que se omitieron
pub fn decode_lenient<T, I>(context: &str, rows: I) -> Vec<T>
where
    I: IntoIterator<Item = Result<T, sqlx::Error>>,
{
    let mut decoded = Vec::new();
    let mut skipped = 0usize;

    for row in rows {
        match row {
            Ok(value) => decoded.push(value),
            Err(e) => {
                skipped += 1;
                log::warn!(
                    "⚠️ Fila omitida en {}: {}",
                    context,
                    sanitize_for_log(&e.to_string())
                );
            }
        }
    }

    if skipped > 0 {
        log::warn!("⚠️ {}: {} fila(s) omitida(s), {} devueltas", context, skipped, decoded.len());
    }

    decoded
}
