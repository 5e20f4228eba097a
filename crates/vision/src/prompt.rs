//! Instructions sent to multimodal models

/// Asks for a damage report in the Detection Report schema
pub const DETECTION_PROMPT: &str = r#"You are an expert road damage detection AI. Analyze this image for potholes, cracks, and road damage.

Return ONLY a valid JSON object (no markdown, no backticks):

{
  "hasPotholes": true or false,
  "totalPotholes": number,
  "detections": [
    {
      "id": number,
      "severity": "HIGH" or "MEDIUM" or "LOW",
      "confidence": number between 0 and 1,
      "location": "description of location in image",
      "estimatedSize": "small" or "medium" or "large",
      "damageType": "pothole" or "crack" or "surface damage",
      "estimatedDepth": "shallow" or "moderate" or "deep",
      "description": "brief technical description"
    }
  ],
  "roadType": "National Highway" or "State Highway" or "District Road" or "Urban Road" or "Rural Road",
  "roadCondition": "Excellent" or "Good" or "Fair" or "Poor" or "Very Poor",
  "overallRiskLevel": "Critical" or "High" or "Moderate" or "Low"
}

IMPORTANT:
- If you see a road/pavement with damage, set hasPotholes to true
- If you see a clear road with NO damage, set hasPotholes to false and totalPotholes to 0
- Be accurate but not too strict
- Look for visible potholes, cracks, worn surfaces
- HIGH severity = dangerous/large damage
- MEDIUM severity = needs attention
- LOW severity = minor wear"#;

/// Asks whether the image is a usable road photo
pub const VERIFICATION_PROMPT: &str = r#"You are screening photos submitted to a road damage reporting service. Decide whether this image shows a road, street, highway or paved surface clearly enough to inspect it for damage.

Return ONLY a valid JSON object (no markdown, no backticks):

{
  "isValid": true or false,
  "reason": "one short sentence explaining the decision"
}

Reject screenshots, documents, people, indoor scenes and images too dark or blurry to inspect."#;
