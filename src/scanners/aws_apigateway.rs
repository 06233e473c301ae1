// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS API Gateway Posture Scanner
 * REST API stage configuration checks
 *
 * Detects:
 * - Execution logging off
 * - Stages without a WAF web ACL
 * - Stages without any authorizer
 * - X-Ray tracing disabled
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, RestApiStage};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AwsApiGatewayScanner;

impl AwsApiGatewayScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_stages(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<Vec<RestApiStage>> {
        let key = ctx.cache_key(&format!("apigateway:stages:{}", region));
        let stages = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("apigateway.list_stages", || api.list_api_stages(region))
                    .await
            })
            .await
            .context("Failed to list API Gateway stages")?;
        Ok(stages)
    }

    async fn scan_region(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<(Vec<Finding>, usize)> {
        let stages = self.fetch_stages(ctx, api, region).await?;
        debug!("[ApiGateway] Found {} stages in {}", stages.len(), region);

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for stage in &stages {
            // Check execution logging
            checks_run += 1;
            if let Some(f) = isolate(
                "apigateway.execution_logging",
                self.check_execution_logging(ctx, region, stage),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check WAF association
            checks_run += 1;
            if let Some(f) =
                isolate("apigateway.waf", self.check_waf(ctx, region, stage)).flatten()
            {
                findings.push(f);
            }

            // Check authorizers
            checks_run += 1;
            if let Some(f) = isolate(
                "apigateway.authorizer",
                self.check_authorizer(ctx, region, stage),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check X-Ray tracing
            checks_run += 1;
            if let Some(f) =
                isolate("apigateway.tracing", self.check_tracing(ctx, region, stage)).flatten()
            {
                findings.push(f);
            }
        }

        Ok((findings, checks_run))
    }

    fn check_execution_logging(
        &self,
        ctx: &ScanContext,
        region: &str,
        stage: &RestApiStage,
    ) -> Result<Option<Finding>> {
        let logging_off = match stage.logging_level.as_deref() {
            Some("ERROR") | Some("INFO") => false,
            _ => true,
        };
        if !logging_off {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "apigateway_no_execution_logging")
            .resource(&stage_resource_id(stage), &stage_arn(region, stage))
            .severity(Severity::Medium)
            .risk_vector(RiskVector::NoAuditTrail)
            .title("API Gateway stage without execution logging")
            .description(format!(
                "Stage '{}' of API '{}' has execution logging off",
                stage.stage_name, stage.api_name
            ))
            .analysis(
                "Request outcomes, integration errors and caller identities are not \
                 recorded, leaving API abuse invisible to operations and forensics.",
            )
            .remediation(remediation("apigateway_no_execution_logging"))
            .evidence("loggingLevel", stage.logging_level.clone())
            .build();
        Ok(Some(finding))
    }

    fn check_waf(
        &self,
        ctx: &ScanContext,
        region: &str,
        stage: &RestApiStage,
    ) -> Result<Option<Finding>> {
        if stage.web_acl_arn.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "apigateway_no_waf")
            .resource(&stage_resource_id(stage), &stage_arn(region, stage))
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ComplianceGap)
            .title("API Gateway stage without WAF")
            .description(format!(
                "Stage '{}' of API '{}' has no web ACL associated",
                stage.stage_name, stage.api_name
            ))
            .analysis(
                "Injection attempts and scripted abuse reach the backend integration \
                 unfiltered instead of being dropped in front of it.",
            )
            .remediation(remediation("apigateway_no_waf"))
            .evidence("webAclArn", serde_json::Value::Null)
            .build();
        Ok(Some(finding))
    }

    fn check_authorizer(
        &self,
        ctx: &ScanContext,
        region: &str,
        stage: &RestApiStage,
    ) -> Result<Option<Finding>> {
        if !stage.authorizer_types.is_empty() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "apigateway_no_authorizer")
            .resource(&stage_resource_id(stage), &stage_arn(region, stage))
            .severity(Severity::High)
            .risk_vector(RiskVector::PublicExposure)
            .title("API Gateway stage without authorizer")
            .description(format!(
                "Stage '{}' of API '{}' has no Cognito, Lambda or JWT authorizer",
                stage.stage_name, stage.api_name
            ))
            .analysis(
                "Every route on the stage is invocable by anyone who discovers the \
                 endpoint URL. Backend integrations run on attacker-supplied input \
                 with no identity attached.",
            )
            .remediation(remediation("apigateway_no_authorizer"))
            .evidence("authorizerTypes", &stage.authorizer_types)
            .build();
        Ok(Some(finding))
    }

    fn check_tracing(
        &self,
        ctx: &ScanContext,
        region: &str,
        stage: &RestApiStage,
    ) -> Result<Option<Finding>> {
        if stage.xray_tracing_enabled {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "apigateway_tracing_disabled")
            .resource(&stage_resource_id(stage), &stage_arn(region, stage))
            .severity(Severity::Low)
            .risk_vector(RiskVector::NoAuditTrail)
            .title("API Gateway X-Ray tracing disabled")
            .description(format!(
                "Stage '{}' of API '{}' does not emit X-Ray traces",
                stage.stage_name, stage.api_name
            ))
            .analysis(
                "Without traces, anomalous latency or an exploited integration path \
                 cannot be followed through the downstream call chain.",
            )
            .remediation(remediation("apigateway_tracing_disabled"))
            .evidence("xrayTracingEnabled", stage.xray_tracing_enabled)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AwsApiGatewayScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsApiGatewayScanner {
    fn service_name(&self) -> &'static str {
        "aws_apigateway"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::ApiManagement
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!(
            "[ApiGateway] Starting scan across {} region(s)",
            ctx.regions.len()
        );

        let mut findings = Vec::new();
        let mut checks_run = 0;
        let mut failed_regions = 0;
        let mut last_error = None;

        for region in &ctx.regions {
            match self.scan_region(ctx, &api, region).await {
                Ok((mut region_findings, region_checks)) => {
                    findings.append(&mut region_findings);
                    checks_run += region_checks;
                }
                Err(e) => {
                    warn!("[ApiGateway] Region {} failed, continuing: {:#}", region, e);
                    failed_regions += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed_regions == ctx.regions.len() {
            if let Some(e) = last_error {
                return Err(e.context("API Gateway scan failed in every region"));
            }
        }

        info!(
            "[ApiGateway] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn stage_resource_id(stage: &RestApiStage) -> String {
    format!("{}/{}", stage.api_id, stage.stage_name)
}

fn stage_arn(region: &str, stage: &RestApiStage) -> String {
    format!(
        "arn:aws:apigateway:{}::/restapis/{}/stages/{}",
        region, stage.api_id, stage.stage_name
    )
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "apigateway_no_execution_logging" => Remediation {
            description: "Enable execution logging on the stage".to_string(),
            steps: vec![
                "Grant API Gateway a CloudWatch Logs role at the account level".to_string(),
                "Set the stage logging level to ERROR or INFO".to_string(),
            ],
            cli_command: Some(
                "aws apigateway update-stage --rest-api-id <api> --stage-name <stage> --patch-operations op=replace,path=/*/*/logging/loglevel,value=ERROR"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "apigateway_no_waf" => Remediation {
            description: "Associate a WAF web ACL with the stage".to_string(),
            steps: vec![
                "Create a regional web ACL with the managed core rule set".to_string(),
                "Associate it with the stage ARN".to_string(),
            ],
            cli_command: Some(
                "aws wafv2 associate-web-acl --web-acl-arn <acl-arn> --resource-arn <stage-arn>"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "apigateway_no_authorizer" => Remediation {
            description: "Require an authorizer on stage routes".to_string(),
            steps: vec![
                "Attach a Cognito or Lambda authorizer to the API".to_string(),
                "Set the authorization type on every method that is not intentionally public".to_string(),
                "Add usage plans and API keys for partner access".to_string(),
            ],
            cli_command: Some(
                "aws apigateway create-authorizer --rest-api-id <api> --name main --type COGNITO_USER_POOLS --provider-arns <pool-arn>"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        "apigateway_tracing_disabled" => Remediation {
            description: "Enable X-Ray tracing for the stage".to_string(),
            steps: vec!["Enable tracing on the stage settings".to_string()],
            cli_command: Some(
                "aws apigateway update-stage --rest-api-id <api> --stage-name <stage> --patch-operations op=replace,path=/tracingEnabled,value=true"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        _ => Remediation {
            description: "Review the stage against the API Gateway baseline".to_string(),
            steps: vec!["Audit logging, authorization and throttling settings".to_string()],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}
