//! The fixed extraction instruction.
//!
//! Consolidation rules (max wins, abbreviation expansion, explaining empty
//! results) live in this text; the model is trusted only as far as
//! `ConsolidatedMetrics::from_model_value` re-checks its answer.

/// Builds the instruction for a batch of `image_count` screenshots.
#[must_use]
pub fn extraction_prompt(image_count: usize) -> String {
    format!(
        r#"INSTRUCCIÓN CRÍTICA: Eres un analista de datos experto. Recibirás un lote de {image_count} imágenes de un único contenido de redes sociales. Tu tarea es consolidar toda la información en UN ÚNICO objeto JSON.

REGLAS DE EXTRACCIÓN Y CONSOLIDACIÓN:
1. Examina TODAS las imágenes para obtener una visión completa.
2. Si una métrica (ej: 'likes') aparece en varias imágenes, usa el valor numérico más alto que encuentres.
3. Convierte siempre abreviaturas ('K', 'M', 'mil') a números completos (ej: 2.5K a 2500, 1.2M a 1200000).
4. 'link_clicks' son los toques o clics en el enlace; 'clicks_stickers' son los toques en stickers de historias.
5. Si una métrica no aparece en ninguna imagen, déjala en null.
6. Si después de examinar todas las imágenes no encuentras NINGUNA métrica, explica por qué en el campo 'extraction_notes'. Por ejemplo: "Las imágenes no contienen contadores numéricos visibles de métricas."
7. Tu respuesta DEBE ser ÚNICAMENTE el objeto JSON, sin ningún otro texto.

El formato requerido es:
{{"likes": null, "comments": null, "shares": null, "saves": null, "views": null, "reach": null, "link_clicks": null, "clicks_stickers": null, "extraction_notes": "Extracción exitosa."}}"#
    )
}
